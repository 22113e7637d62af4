use std::fmt;

use crate::application::content::QueryParams;

/// Identity of a cached query result: the query text plus its canonical
/// parameters. The revalidation window is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    query: String,
    params: String,
}

impl QueryKey {
    pub fn new(query: &str, params: &QueryParams) -> Self {
        Self {
            query: query.trim().to_string(),
            params: params.canonical(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.query)
        } else {
            write!(f, "{} [{}]", self.query, self.params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_distinguish_keys_for_the_same_query() {
        let query = r#"*[_type == "post" && slug.current == $slug][0]"#;
        let first = QueryKey::new(query, &QueryParams::new().with("slug", "a"));
        let second = QueryKey::new(query, &QueryParams::new().with("slug", "b"));
        let again = QueryKey::new(query, &QueryParams::new().with("slug", "a"));
        assert_ne!(first, second);
        assert_eq!(first, again);
    }
}
