//! Row type of the PDQm patient view.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::types::date::iso_date;

/// One row of the patient directory.
///
/// `identifier` holds either a bare value or `system|value`. Everything but
/// `id` may be NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub identifier: Option<String>,
    pub name_use: Option<String>,
    pub name_family: Option<String>,
    pub name_given_0: Option<String>,
    pub name_prefix_0: Option<String>,
    pub name_text: Option<String>,
    pub mothers_maiden_name: Option<String>,
    pub address_use: Option<String>,
    pub address_line_0: Option<String>,
    pub address_city: Option<String>,
    pub address_postal_code: Option<String>,
    pub address_country: Option<String>,
    pub tel_home: Option<String>,
    pub tel_work: Option<String>,
    pub tel_mobile: Option<String>,
    pub email: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub birthdate: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub deathdate: Option<Date>,
    pub gender: Option<String>,
    pub marital_code: Option<String>,
}

/// A non-NULL column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Date(Date),
}

impl PatientRecord {
    /// View column names, in projection order.
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "identifier",
        "name_use",
        "name_family",
        "name_given_0",
        "name_prefix_0",
        "name_text",
        "mothersMaidenName",
        "address_use",
        "address_line_0",
        "address_city",
        "address_postalCode",
        "address_country",
        "tel_home",
        "tel_work",
        "tel_mobile",
        "email",
        "birthdate",
        "deathdate",
        "gender",
        "marital_code",
    ];

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Look a value up by view column name. `None` for NULL or unknown columns.
    pub fn column(&self, name: &str) -> Option<FieldValue<'_>> {
        let text = match name {
            "id" => Some(&self.id),
            "identifier" => self.identifier.as_ref(),
            "name_use" => self.name_use.as_ref(),
            "name_family" => self.name_family.as_ref(),
            "name_given_0" => self.name_given_0.as_ref(),
            "name_prefix_0" => self.name_prefix_0.as_ref(),
            "name_text" => self.name_text.as_ref(),
            "mothersMaidenName" => self.mothers_maiden_name.as_ref(),
            "address_use" => self.address_use.as_ref(),
            "address_line_0" => self.address_line_0.as_ref(),
            "address_city" => self.address_city.as_ref(),
            "address_postalCode" => self.address_postal_code.as_ref(),
            "address_country" => self.address_country.as_ref(),
            "tel_home" => self.tel_home.as_ref(),
            "tel_work" => self.tel_work.as_ref(),
            "tel_mobile" => self.tel_mobile.as_ref(),
            "email" => self.email.as_ref(),
            "gender" => self.gender.as_ref(),
            "marital_code" => self.marital_code.as_ref(),
            "birthdate" => return self.birthdate.map(FieldValue::Date),
            "deathdate" => return self.deathdate.map(FieldValue::Date),
            _ => None,
        };
        text.map(|s| FieldValue::Text(s.as_str()))
    }
}
