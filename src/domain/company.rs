use std::fmt;

/// How a search term is interpreted by the portal. An 11-digit decimal
/// string is a NIRE (registry identifier) and yields a detail page;
/// anything else is treated as a company name and yields a results table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QueryKind {
    Nire,
    Name,
}

#[derive(Debug, Clone)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        SearchQuery(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> QueryKind {
        let is_nire = self.0.len() == 11 && self.0.chars().all(|c| c.is_ascii_digit());
        match is_nire {
            true => QueryKind::Nire,
            false => QueryKind::Name,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub district: String,
    pub complement: String,
    pub municipality: String,
    pub postal_code: String,
    pub state: String,
}

/// Full record parsed from a detail page (NIRE query).
#[derive(Debug, PartialEq, Clone)]
pub struct CompanyDetail {
    pub name: String,
    pub legal_form: String,
    pub activity_start: String,
    pub cnpj: String,
    pub state_registration: String,
    pub incorporation_date: String,
    pub purpose: String,
    pub capital: String,
    pub address: Address,
}

/// One row of the results table (name query).
#[derive(Debug, PartialEq, Clone)]
pub struct CompanySummary {
    pub nire: String,
    pub name: String,
    pub municipality: String,
}

#[derive(Debug, PartialEq, Clone)]
pub enum SearchOutcome {
    Detail(CompanyDetail),
    Summaries(Vec<CompanySummary>),
    NoResults,
}

impl SearchOutcome {
    /// Whether there is anything worth printing: a no-results outcome
    /// and an empty summary list are both silent.
    pub fn has_content(&self) -> bool {
        match self {
            SearchOutcome::Detail(_) => true,
            SearchOutcome::Summaries(rows) => !rows.is_empty(),
            SearchOutcome::NoResults => false,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Detail(detail) => {
                writeln!(f, "Name: {}", detail.name)?;
                writeln!(f, "Legal form: {}", detail.legal_form)?;
                writeln!(f, "Activity start: {}", detail.activity_start)?;
                writeln!(f, "CNPJ: {}", detail.cnpj)?;
                writeln!(f, "State registration: {}", detail.state_registration)?;
                writeln!(f, "Incorporation date: {}", detail.incorporation_date)?;
                writeln!(f, "Purpose: {}", detail.purpose)?;
                writeln!(f, "Capital: {}", detail.capital)?;
                writeln!(f, "Street: {}", detail.address.street)?;
                writeln!(f, "Number: {}", detail.address.number)?;
                writeln!(f, "District: {}", detail.address.district)?;
                writeln!(f, "Complement: {}", detail.address.complement)?;
                writeln!(f, "Municipality: {}", detail.address.municipality)?;
                writeln!(f, "Postal code: {}", detail.address.postal_code)?;
                write!(f, "State: {}", detail.address.state)
            }
            SearchOutcome::Summaries(rows) => {
                for row in rows {
                    writeln!(f, "{} | {} | {}", row.nire, row.name, row.municipality)?;
                }
                write!(f, "{} result(s)", rows.len())
            }
            SearchOutcome::NoResults => write!(f, "No results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CompanySummary, QueryKind, SearchOutcome, SearchQuery};

    #[test]
    fn eleven_digit_query_is_a_nire() {
        let query = SearchQuery::new("12345678901");
        assert_eq!(query.kind(), QueryKind::Nire);
    }

    #[test]
    fn company_name_query_is_a_name() {
        let query = SearchQuery::new("Acme Corp");
        assert_eq!(query.kind(), QueryKind::Name);
    }

    #[test]
    fn ten_digit_query_is_a_name() {
        let query = SearchQuery::new("1234567890");
        assert_eq!(query.kind(), QueryKind::Name);
    }

    #[test]
    fn twelve_digit_query_is_a_name() {
        let query = SearchQuery::new("123456789012");
        assert_eq!(query.kind(), QueryKind::Name);
    }

    #[test]
    fn digits_with_letter_is_a_name() {
        let query = SearchQuery::new("1234567890a");
        assert_eq!(query.kind(), QueryKind::Name);
    }

    #[test]
    fn no_results_outcome_has_no_content() {
        assert!(!SearchOutcome::NoResults.has_content());
    }

    #[test]
    fn empty_summary_list_has_no_content() {
        assert!(!SearchOutcome::Summaries(Vec::new()).has_content());
    }

    #[test]
    fn populated_summary_list_has_content() {
        let outcome = SearchOutcome::Summaries(vec![CompanySummary {
            nire: "35200000001".to_string(),
            name: "ACME COMERCIO LTDA".to_string(),
            municipality: "SAO PAULO".to_string(),
        }]);
        assert!(outcome.has_content());
    }
}
