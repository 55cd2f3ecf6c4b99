//! SPARQL query text builders.
//!
//! All free-text input is regex-escaped before being spliced into a FILTER,
//! and exact bindings are wrapped as IRIs/literals, so caller input can never
//! change the query structure.

/// Row limit for structural (pattern/fuzzy/expanded) queries.
const STRUCTURAL_LIMIT: usize = 100;

/// Row limit for external resource lookups.
const RESOURCE_LIMIT: usize = 10;

/// Row limit for related-term harvesting.
const RELATED_LIMIT: usize = 10;

/// Escape regex metacharacters for use inside a SPARQL `regex()` filter.
pub fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape double quotes for use inside a SPARQL string literal.
fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn language_filter(language: Option<&str>) -> String {
    match language {
        Some(lang) => format!("FILTER(lang(?object) = \"{}\")", escape_literal(lang)),
        None => String::new(),
    }
}

/// Triple-pattern query with optional exact subject/predicate/object bindings.
///
/// Unbound positions stay as variables; a bound subject/predicate becomes an
/// IRI, a bound object a literal.
pub fn pattern_query(
    subject: Option<&str>,
    predicate: Option<&str>,
    object: Option<&str>,
    language: Option<&str>,
) -> String {
    let subject_pattern = subject
        .map(|s| format!("<{s}>"))
        .unwrap_or_else(|| "?subject".to_string());
    let predicate_pattern = predicate
        .map(|p| format!("<{p}>"))
        .unwrap_or_else(|| "?predicate".to_string());
    let object_pattern = object
        .map(|o| format!("\"{}\"", escape_literal(o)))
        .unwrap_or_else(|| "?object".to_string());

    format!(
        "SELECT ?subject ?predicate ?object\n\
         WHERE {{\n\
           {subject_pattern} {predicate_pattern} {object_pattern} .\n\
           {}\n\
         }}\n\
         LIMIT {STRUCTURAL_LIMIT}",
        language_filter(language),
    )
}

/// Case-insensitive regex match of one term against all three positions.
pub fn fuzzy_query(term: &str, language: Option<&str>) -> String {
    disjunctive_query(&[term.to_string()], language)
}

/// One disjunctive regex filter over every expansion term, executed as a
/// single query to bound the number of round trips.
pub fn disjunctive_query(terms: &[String], language: Option<&str>) -> String {
    let pattern = terms
        .iter()
        .map(|t| escape_regex(t))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = escape_literal(&pattern);

    format!(
        "SELECT DISTINCT ?subject ?predicate ?object\n\
         WHERE {{\n\
           ?subject ?predicate ?object .\n\
           FILTER(\n\
             regex(str(?subject), \"{pattern}\", \"i\") ||\n\
             regex(str(?predicate), \"{pattern}\", \"i\") ||\n\
             regex(str(?object), \"{pattern}\", \"i\")\n\
           )\n\
           {}\n\
         }}\n\
         LIMIT {STRUCTURAL_LIMIT}",
        language_filter(language),
    )
}

/// External resource lookup by label containment (DBpedia-shaped).
pub fn resource_query(query: &str, language: &str) -> String {
    let escaped = escape_literal(&escape_regex(query));
    let lang = escape_literal(language);

    format!(
        "PREFIX dbo: <http://dbpedia.org/ontology/>\n\
         PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n\
         PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>\n\
         SELECT DISTINCT ?resource ?label ?abstract ?type\n\
         WHERE {{\n\
           ?resource rdfs:label ?label .\n\
           FILTER(regex(?label, \"{escaped}\", \"i\"))\n\
           FILTER(lang(?label) = \"{lang}\" || lang(?label) = \"\")\n\
           OPTIONAL {{\n\
             ?resource dbo:abstract ?abstract .\n\
             FILTER(lang(?abstract) = \"{lang}\" || lang(?abstract) = \"\")\n\
           }}\n\
           OPTIONAL {{ ?resource rdf:type ?type }}\n\
         }}\n\
         LIMIT {RESOURCE_LIMIT}"
    )
}

/// Terms reachable over `skos:related`/`owl:sameAs`/`rdfs:seeAlso` edges, in
/// either direction, from any entity whose label matches the term.
pub fn related_terms_query(term: &str) -> String {
    let escaped = escape_literal(&escape_regex(term));

    format!(
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n\
         PREFIX skos: <http://www.w3.org/2004/02/skos/core#>\n\
         PREFIX owl: <http://www.w3.org/2002/07/owl#>\n\
         SELECT DISTINCT ?relatedLabel\n\
         WHERE {{\n\
           {{\n\
             ?subject rdfs:label ?label .\n\
             FILTER(regex(str(?label), \"{escaped}\", \"i\"))\n\
             ?subject ?relation ?related .\n\
             ?related rdfs:label ?relatedLabel .\n\
             FILTER(?relation IN (skos:related, owl:sameAs, rdfs:seeAlso))\n\
           }}\n\
           UNION\n\
           {{\n\
             ?subject rdfs:label ?label .\n\
             FILTER(regex(str(?label), \"{escaped}\", \"i\"))\n\
             ?related ?relation ?subject .\n\
             ?related rdfs:label ?relatedLabel .\n\
             FILTER(?relation IN (skos:related, owl:sameAs, rdfs:seeAlso))\n\
           }}\n\
         }}\n\
         LIMIT {RELATED_LIMIT}"
    )
}

/// Every triple in the store, unbounded. Used to feed the vector indexer.
pub fn all_triples_query() -> String {
    "SELECT ?subject ?predicate ?object WHERE { ?subject ?predicate ?object }".to_string()
}

/// INSERT DATA statement for a single triple with a literal object.
pub fn insert_triple(subject: &str, predicate: &str, object: &str) -> String {
    format!(
        "INSERT DATA {{ <{subject}> <{predicate}> \"{}\" }}",
        escape_literal(object)
    )
}
