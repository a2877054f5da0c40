//! List query parameters for `/api/resource/<doctype>`

use campusbridge_domain::QueryFilter;
use serde_json::Value;

/// One list request against a doctype.
#[derive(Debug, Clone)]
pub struct ListQuery {
    doctype: String,
    fields: Vec<String>,
    filter: QueryFilter,
    limit: Option<usize>,
    order_by: Option<String>,
}

impl ListQuery {
    pub fn new(doctype: impl Into<String>) -> Self {
        Self {
            doctype: doctype.into(),
            fields: Vec::new(),
            filter: QueryFilter::new(),
            limit: None,
            order_by: None,
        }
    }

    #[must_use]
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn doctype(&self) -> &str {
        &self.doctype
    }

    /// Query-string pairs in the form the ERP expects.
    ///
    /// `fields` and `filters` are JSON-encoded; empty ones are omitted.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(4);

        if let Some(limit) = self.limit {
            params.push(("limit_page_length".to_string(), limit.to_string()));
        }
        if !self.fields.is_empty() {
            let fields = Value::from(self.fields.clone());
            params.push(("fields".to_string(), fields.to_string()));
        }
        if !self.filter.is_empty() {
            params.push(("filters".to_string(), self.filter.to_json().to_string()));
        }
        if let Some(order_by) = &self.order_by {
            params.push(("order_by".to_string(), order_by.clone()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use campusbridge_domain::FilterOp;

    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn encodes_every_part() {
        let params = ListQuery::new("Assessment Result")
            .fields(&["name", "grade"])
            .filter(QueryFilter::new().with("student", FilterOp::Eq, "EDU-STU-7"))
            .limit(20)
            .order_by("creation desc")
            .to_params();

        assert_eq!(param(&params, "limit_page_length"), Some("20"));
        assert_eq!(param(&params, "fields"), Some(r#"["name","grade"]"#));
        assert_eq!(param(&params, "filters"), Some(r#"[["student","=","EDU-STU-7"]]"#));
        assert_eq!(param(&params, "order_by"), Some("creation desc"));
    }

    #[test]
    fn omits_empty_parts() {
        let params = ListQuery::new("Academic Year").to_params();
        assert!(params.is_empty());
    }
}
