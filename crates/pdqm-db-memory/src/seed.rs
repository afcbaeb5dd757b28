use pdqm_search::PatientRecord;
use time::macros::date;

use crate::InMemoryDirectory;

/// A small demo directory for local runs.
pub fn demo_directory() -> InMemoryDirectory {
    InMemoryDirectory::with_records(demo_patients())
}

pub fn demo_patients() -> Vec<PatientRecord> {
    vec![
        PatientRecord {
            identifier: Some("428889876".into()),
            name_use: Some("official".into()),
            name_family: Some("SMITH".into()),
            name_given_0: Some("JOHN".into()),
            name_text: Some("Mr John Smith".into()),
            mothers_maiden_name: Some("BROWN".into()),
            address_use: Some("home".into()),
            address_line_0: Some("Main Street 1".into()),
            address_city: Some("Amsterdam".into()),
            address_postal_code: Some("1011 AA".into()),
            address_country: Some("NL".into()),
            tel_home: Some("+31-20-1234567".into()),
            email: Some("john.smith@example.org".into()),
            birthdate: Some(date!(1980 - 05 - 12)),
            gender: Some("male".into()),
            marital_code: Some("M".into()),
            ..PatientRecord::new("1")
        },
        PatientRecord {
            identifier: Some("urn:oid:2.16.840.1.113883.2.4.6.3|347149388".into()),
            name_use: Some("official".into()),
            name_family: Some("Jansen".into()),
            name_given_0: Some("Maria".into()),
            name_text: Some("Mevr. Maria Jansen".into()),
            mothers_maiden_name: Some("De Vries".into()),
            address_use: Some("home".into()),
            address_line_0: Some("Kerkstraat 10".into()),
            address_city: Some("Amstelveen".into()),
            address_postal_code: Some("1181AB".into()),
            address_country: Some("NL".into()),
            tel_work: Some("+31-20-7654321".into()),
            tel_mobile: Some("+31-6-12345678".into()),
            email: Some("maria.jansen@example.org".into()),
            birthdate: Some(date!(1975 - 01 - 01)),
            gender: Some("female".into()),
            marital_code: Some("S".into()),
            ..PatientRecord::new("2")
        },
        PatientRecord {
            name_use: Some("official".into()),
            name_family: Some("Smythe".into()),
            name_given_0: Some("Jon".into()),
            name_text: Some("Jon Smythe".into()),
            address_use: Some("home".into()),
            address_line_0: Some("Baker Street 221 B".into()),
            address_city: Some("London".into()),
            address_postal_code: Some("NW1".into()),
            address_country: Some("GB".into()),
            email: Some("jon.smythe@example.org".into()),
            birthdate: Some(date!(1980 - 05 - 12)),
            gender: Some("male".into()),
            ..PatientRecord::new("3")
        },
    ]
}
