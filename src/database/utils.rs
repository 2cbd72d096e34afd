use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?").expect("placeholder pattern is valid"));

/// Collapses whitespace and rewrites `?` placeholders into Postgres `$n` form.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let mut param_index = 0;
    PLACEHOLDER
        .replace_all(&cleaned, |_: &regex::Captures| {
            param_index += 1;
            format!("${}", param_index)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::sql;

    #[test]
    fn numbers_placeholders_in_order() {
        let query = sql(r#"
            SELECT id
            FROM registrations
            WHERE opportunity_id = ?
                AND status = ?
        "#);
        assert_eq!(
            query,
            "SELECT id FROM registrations WHERE opportunity_id = $1 AND status = $2"
        );
    }

    #[test]
    fn leaves_queries_without_placeholders_alone() {
        assert_eq!(sql("SELECT COUNT(*)   FROM profiles"), "SELECT COUNT(*) FROM profiles");
    }
}
