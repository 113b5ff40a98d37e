use std::collections::HashMap;

#[derive(PartialEq, Debug)]
pub struct QueryString {
    items: HashMap<String, String>,
}

impl QueryString {
    pub fn from(buf: &str) -> Self {
        let vs: Vec<(String, String)> = serde_urlencoded::from_str(buf).unwrap_or_else(|_| vec![]);
        let items: HashMap<String, String> = vs.into_iter().collect();

        QueryString {
            items,
        }
    }

    /// Empty values count as absent: `?tag=` means no tag filter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_str() {
        let buf = "category=Tech&search=caf%C3%A9&postId=note%2Fa.md";
        let qs = QueryString::from(buf);
        assert_eq!(qs.get("category"), Some("Tech"));
        assert_eq!(qs.get("search"), Some("café"));
        assert_eq!(qs.get("postId"), Some("note/a.md"));
        assert_eq!(qs.get("missing"), None);
    }

    #[test]
    fn test_parse_invalid_query_str() {
        let buf = "";
        let expected = QueryString {
            items: Default::default(),
        };
        assert_eq!(QueryString::from(buf), expected);
    }

    #[test]
    fn test_key_only_is_absent() {
        let qs = QueryString::from("tag&status=  ");
        assert_eq!(qs.get("tag"), None);
        assert_eq!(qs.get("status"), None);
    }
}
