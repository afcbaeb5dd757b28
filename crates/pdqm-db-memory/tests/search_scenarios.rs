//! End-to-end search behaviour against the in-memory directory.

use async_trait::async_trait;
use pdqm_db_memory::InMemoryDirectory;
use pdqm_search::{
    BackendError, BuiltQuery, PatientRecord, ResultSet, SearchEngine, SearchError, SearchExecutor,
    SearchSettings, SearchWarning, parse_query_string,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::Date;
use time::macros::date;

fn patient(id: &str, family: &str, gender: &str) -> PatientRecord {
    PatientRecord {
        name_family: Some(family.into()),
        gender: Some(gender.into()),
        ..PatientRecord::new(id)
    }
}

fn born(id: &str, birthdate: Date) -> PatientRecord {
    PatientRecord {
        birthdate: Some(birthdate),
        ..PatientRecord::new(id)
    }
}

fn with_identifier(id: &str, identifier: &str) -> PatientRecord {
    PatientRecord {
        identifier: Some(identifier.into()),
        ..PatientRecord::new(id)
    }
}

fn engine() -> SearchEngine {
    SearchEngine::new(SearchSettings::default()).unwrap()
}

async fn search(
    directory: &InMemoryDirectory,
    query: &str,
) -> Result<ResultSet<PatientRecord>, SearchError> {
    engine()
        .search_params(directory, &parse_query_string(query))
        .await
}

async fn ids(directory: &InMemoryDirectory, query: &str) -> BTreeSet<String> {
    let query = if query.is_empty() {
        "_count=100".to_string()
    } else {
        format!("{query}&_count=100")
    };
    search(directory, &query)
        .await
        .unwrap()
        .rows
        .into_iter()
        .map(|r| r.id)
        .collect()
}

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| (*s).to_string()).collect()
}

/// Counts backend calls so tests can assert nothing was scanned.
struct CountingDirectory {
    inner: InMemoryDirectory,
    calls: AtomicUsize,
}

#[async_trait]
impl SearchExecutor for CountingDirectory {
    type Row = PatientRecord;

    async fn count(&self, query: &BuiltQuery) -> Result<u64, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count(query).await
    }

    async fn fetch(&self, query: &BuiltQuery) -> Result<Vec<PatientRecord>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(query).await
    }
}

#[tokio::test]
async fn family_or_list_and_gender_with_paging() {
    let directory = InMemoryDirectory::with_records([
        patient("1", "Smith", "male"),
        patient("2", "Smythe", "female"),
        patient("3", "Smithson", "male"),
        patient("4", "Jones", "male"),
    ]);

    let result = search(&directory, "family=smi,smy&gender=male&_count=2&_page=1")
        .await
        .unwrap();

    let families: Vec<_> = result
        .rows
        .iter()
        .map(|r| r.name_family.clone().unwrap_or_default())
        .collect();
    assert_eq!(families, vec!["Smith", "Smithson"]);
    assert_eq!(result.total, 2);
    assert!(!result.has_next);
    assert!(result.next_page().is_none());
}

#[tokio::test]
async fn repeating_a_key_narrows_relative_to_comma_list() {
    let directory = InMemoryDirectory::with_records([
        patient("1", "Smith", "male"),
        patient("2", "Smythe", "female"),
        patient("3", "Smismyth", "male"),
        patient("4", "Jones", "male"),
    ]);

    let anded = ids(&directory, "family=SMI&family=SMY").await;
    let ored = ids(&directory, "family=SMI,SMY").await;

    assert_eq!(anded, set(&["3"]));
    assert_eq!(ored, set(&["1", "2", "3"]));
    assert!(anded.is_subset(&ored));
}

#[tokio::test]
async fn identifier_cross_product_matches_exactly_four_pairs() {
    let directory = InMemoryDirectory::with_records([
        with_identifier("a1", "sysA|v1"),
        with_identifier("a2", "sysA|v2"),
        with_identifier("b1", "sysB|v1"),
        with_identifier("b2", "SYSB|V2"),
        with_identifier("c1", "sysC|v1"),
        with_identifier("a3", "sysA|v3"),
        with_identifier("bare", "v1"),
    ]);

    let matched = ids(&directory, "identifier=sysA,sysB|v1,v2").await;
    assert_eq!(matched, set(&["a1", "a2", "b1", "b2"]));
}

#[tokio::test]
async fn identifier_separate_tokens_match_each_token() {
    let directory = InMemoryDirectory::with_records([
        with_identifier("a1", "sysA|v1"),
        with_identifier("b2", "sysB|v2"),
        with_identifier("a2", "sysA|v2"),
    ]);

    assert_eq!(
        ids(&directory, "identifier=sysA|v1,sysB|v2").await,
        set(&["a1", "b2"])
    );

    let err = search(&directory, "identifier=sysA|v1,v2,sysB|v3")
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidParameterValue { ref param, .. } if param == "identifier"));
}

#[tokio::test]
async fn identifier_bare_value_and_system_only_forms() {
    let directory = InMemoryDirectory::with_records([
        with_identifier("plain", "428889876"),
        with_identifier("qualified", "urn:oid:2.16.840.1.113883.2.4.6.3|428889876"),
        with_identifier("other", "urn:oid:2.16.840.1.113883.2.4.6.3|999"),
        with_identifier("suffix", "1428889876"),
    ]);

    assert_eq!(
        ids(&directory, "identifier=428889876").await,
        set(&["plain", "qualified"])
    );
    assert_eq!(
        ids(&directory, "identifier=urn:oid:2.16.840.1.113883.2.4.6.3|").await,
        set(&["qualified", "other"])
    );
    assert_eq!(ids(&directory, "identifier=|").await.len(), 4);
}

#[tokio::test]
async fn birthdate_prefixes_and_partial_dates() {
    let directory = InMemoryDirectory::with_records([
        born("1979-12-31", date!(1979 - 12 - 31)),
        born("1980-01-01", date!(1980 - 01 - 01)),
        born("1980-05-01", date!(1980 - 05 - 01)),
        born("1980-05-31", date!(1980 - 05 - 31)),
        born("1980-12-31", date!(1980 - 12 - 31)),
        born("1981-01-01", date!(1981 - 01 - 01)),
    ]);

    assert_eq!(
        ids(&directory, "birthdate=ge1980").await,
        set(&["1980-01-01", "1980-05-01", "1980-05-31", "1980-12-31", "1981-01-01"])
    );
    assert_eq!(
        ids(&directory, "birthdate=le1980").await,
        set(&["1979-12-31", "1980-01-01", "1980-05-01", "1980-05-31", "1980-12-31"])
    );
    assert_eq!(
        ids(&directory, "birthdate=1980-05").await,
        set(&["1980-05-01", "1980-05-31"])
    );
    assert_eq!(
        ids(&directory, "birthdate=gt1980").await,
        set(&["1981-01-01"])
    );
    assert_eq!(
        ids(&directory, "birthdate=lt1980").await,
        set(&["1979-12-31"])
    );
    assert_eq!(
        ids(&directory, "birthdate=ne1980").await,
        set(&["1979-12-31", "1981-01-01"])
    );
}

#[tokio::test]
async fn birthdate_occurrences_intersect() {
    let directory = InMemoryDirectory::with_records([
        born("before", date!(1974 - 12 - 31)),
        born("start", date!(1975 - 01 - 01)),
        born("end", date!(1985 - 12 - 31)),
        born("after", date!(1986 - 01 - 01)),
    ]);

    assert_eq!(
        ids(&directory, "birthdate=ge1975-01-01&birthdate=le1985-12-31").await,
        set(&["start", "end"])
    );
}

#[tokio::test]
async fn malformed_birthdate_fails_without_scanning() {
    let directory = CountingDirectory {
        inner: InMemoryDirectory::with_records([born("1", date!(1980 - 01 - 01))]),
        calls: AtomicUsize::new(0),
    };

    let err = engine()
        .search_params(&directory, &parse_query_string("birthdate=zz1980"))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::InvalidParameterValue { ref param, .. } if param == "birthdate"));
    assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exact_and_contains_string_matching() {
    let directory = InMemoryDirectory::with_records([
        patient("1", "Smith", "male"),
        patient("2", "SMITH", "male"),
        patient("3", "Smithson", "male"),
        patient("4", "Blacksmith", "male"),
    ]);

    assert_eq!(
        ids(&directory, "family:exact=SMITH").await,
        set(&["1", "2"])
    );
    assert_eq!(
        ids(&directory, "family=smi").await,
        set(&["1", "2", "3", "4"])
    );
}

#[tokio::test]
async fn total_is_invariant_under_paging() {
    let directory = InMemoryDirectory::with_records(
        (1..=7).map(|i| patient(&format!("p{i}"), "Smith", "male")),
    );

    let mut seen = Vec::new();
    for page in 1..=4 {
        let result = search(&directory, &format!("family=smith&_count=3&_page={page}"))
            .await
            .unwrap();
        assert_eq!(result.total, 7);
        assert!(result.rows.len() <= 3);
        assert_eq!(result.has_next, page < 3);
        seen.extend(result.rows.into_iter().map(|r| r.id));
    }
    assert_eq!(seen, vec!["p1", "p2", "p3", "p4", "p5", "p6", "p7"]);
}

#[tokio::test]
async fn empty_value_does_not_filter() {
    let directory = InMemoryDirectory::with_records([
        patient("1", "Smith", "male"),
        patient("2", "Jones", "female"),
    ]);

    assert_eq!(ids(&directory, "family=").await, set(&["1", "2"]));
    assert_eq!(ids(&directory, "family=&gender=female").await, set(&["2"]));
    assert_eq!(ids(&directory, "").await, set(&["1", "2"]));
}

#[tokio::test]
async fn unsupported_modifier_degrades_with_warning() {
    let directory = InMemoryDirectory::with_records([
        patient("1", "Smith", "male"),
        patient("2", "Jones", "female"),
    ]);

    let result = search(&directory, "gender:exact=male").await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(
        result.warnings,
        vec![SearchWarning::UnsupportedModifier {
            param: "gender".into(),
            modifier: "exact".into(),
        }]
    );
}

#[tokio::test]
async fn address_and_telecom_fan_out() {
    let directory = pdqm_db_memory::demo_directory();

    assert_eq!(ids(&directory, "address=amst").await, set(&["1", "2"]));
    assert_eq!(ids(&directory, "address-country=GB").await, set(&["3"]));
    assert_eq!(ids(&directory, "address:exact=nl").await, set(&["1", "2"]));
    assert_eq!(ids(&directory, "address-postalcode=1181").await, set(&["2"]));
    assert_eq!(ids(&directory, "telecom=phone|20-1234567").await, set(&["1"]));
    assert_eq!(ids(&directory, "telecom=email|smythe").await, set(&["3"]));
    assert_eq!(ids(&directory, "telecom=example.org").await.len(), 3);
}

#[tokio::test]
async fn telecom_system_without_value_requires_that_system() {
    let directory = InMemoryDirectory::with_records([
        PatientRecord {
            tel_home: Some("+31-20-1234567".into()),
            ..PatientRecord::new("phone")
        },
        PatientRecord {
            email: Some("no.phone@example.org".into()),
            ..PatientRecord::new("email-only")
        },
        PatientRecord::new("nothing"),
    ]);

    assert_eq!(ids(&directory, "telecom=phone|").await, set(&["phone"]));
    assert_eq!(ids(&directory, "telecom=email|").await, set(&["email-only"]));
}

#[tokio::test]
async fn unknown_telecom_system_is_rejected() {
    let directory = pdqm_db_memory::demo_directory();
    let err = search(&directory, "telecom=fax|123").await.unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn id_and_unknown_keys() {
    let directory = pdqm_db_memory::demo_directory();

    assert_eq!(ids(&directory, "_id=2,3").await, set(&["2", "3"]));
    assert_eq!(ids(&directory, "name=whatever&_format=json").await.len(), 3);
}

#[tokio::test]
async fn out_of_range_count_is_rejected() {
    let directory = pdqm_db_memory::demo_directory();
    for query in ["_count=0", "_count=101", "_page=0", "_count=ten"] {
        let err = search(&directory, query).await.unwrap_err();
        assert!(err.is_client_error(), "{query} should be rejected");
    }
}
