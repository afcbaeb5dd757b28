use pdqm_search::{Comparison, Condition, FieldValue, PatientRecord, PredicateNode};

/// Evaluate a predicate against one record.
///
/// Mirrors the SQL rendering: NULL columns never match, text comparisons
/// ignore case unless the condition says otherwise, an empty `Or` is false
/// and an empty `And` is true.
pub fn matches(node: &PredicateNode, record: &PatientRecord) -> bool {
    match node {
        PredicateNode::Atom(condition) => matches_condition(condition, record),
        PredicateNode::And(children) => children.iter().all(|c| matches(c, record)),
        PredicateNode::Or(children) => children.iter().any(|c| matches(c, record)),
    }
}

fn matches_condition(condition: &Condition, record: &PatientRecord) -> bool {
    let Some(field) = record.column(&condition.column) else {
        return false;
    };

    match (&condition.comparison, field) {
        (Comparison::Equals { value, ignore_case }, FieldValue::Text(text)) => {
            if *ignore_case {
                text.to_lowercase() == value.to_lowercase()
            } else {
                text == value
            }
        }
        (Comparison::Contains(value), FieldValue::Text(text)) => {
            text.to_lowercase().contains(&value.to_lowercase())
        }
        (Comparison::StartsWith(value), FieldValue::Text(text)) => {
            text.to_lowercase().starts_with(&value.to_lowercase())
        }
        (Comparison::EndsWith(value), FieldValue::Text(text)) => {
            text.to_lowercase().ends_with(&value.to_lowercase())
        }
        (Comparison::Range(bound), FieldValue::Date(date)) => bound.contains(date),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdqm_search::DateBound;
    use time::macros::date;

    fn record() -> PatientRecord {
        PatientRecord {
            identifier: Some("urn:oid:2.16.840.1.113883.2.4.6.3|428889876".into()),
            name_family: Some("SMITH".into()),
            birthdate: Some(date!(1980 - 05 - 12)),
            ..PatientRecord::new("1")
        }
    }

    fn atom(condition: Condition) -> PredicateNode {
        PredicateNode::Atom(condition)
    }

    #[test]
    fn test_text_comparisons_ignore_case() {
        let r = record();
        assert!(matches(&atom(Condition::contains("name_family", "mit")), &r));
        assert!(matches(&atom(Condition::equals_ci("name_family", "smith")), &r));
        assert!(!matches(&atom(Condition::equals("name_family", "smith")), &r));
        assert!(matches(&atom(Condition::ends_with("identifier", "|428889876")), &r));
        assert!(matches(
            &atom(Condition::starts_with("identifier", "URN:OID:2.16.840.1.113883.2.4.6.3|")),
            &r
        ));
    }

    #[test]
    fn test_null_column_never_matches() {
        let r = record();
        assert!(!matches(&atom(Condition::contains("email", "")), &r));
    }

    #[test]
    fn test_range_on_date_column() {
        let r = record();
        let may = DateBound::between(date!(1980 - 05 - 01), date!(1980 - 06 - 01));
        assert!(matches(&atom(Condition::range("birthdate", may)), &r));
        assert!(!matches(
            &atom(Condition::range("birthdate", DateBound::since(date!(1981 - 01 - 01)))),
            &r
        ));
        assert!(!matches(&atom(Condition::range("name_family", may)), &r));
    }

    #[test]
    fn test_empty_groups() {
        let r = record();
        assert!(matches(&PredicateNode::match_all(), &r));
        assert!(!matches(&PredicateNode::Or(vec![]), &r));
    }
}
