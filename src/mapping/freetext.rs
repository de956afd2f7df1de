//! Free-text Mapper: best-effort identity and lot-number extraction from an
//! unstructured description.
//!
//! Contract: first match, not best match. The first registered table name
//! appearing as a case-insensitive substring of the text wins, and the first
//! plausible lot token wins. No disambiguation beyond that.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::WarehouseStore;
use crate::error::DwhResult;
use crate::models::TableIdentity;

/// Lot number sentinel when no plausible token is found.
pub const LOTNO_NOT_FOUND: &str = "-";

/// Flat identity-plus-lotno structure produced per free-text lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FreetextMapping {
    pub table_name: Option<String>,
    pub department: Option<String>,
    pub product_code: Option<String>,
    pub process_code: Option<String>,
    pub process_name: Option<String>,
    pub lotno: String,
}

pub struct FreetextMapper {
    store: Arc<dyn WarehouseStore>,
}

impl FreetextMapper {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    /// Map a description to identity fields and a lot number. Heuristic:
    /// the result is a guess, surfaced as-is.
    pub async fn map_freetext(&self, text: &str) -> DwhResult<FreetextMapping> {
        let identities = self.store.list_table_identities().await?;

        let mut mapping = match match_identity(&identities, text) {
            Some(identity) => FreetextMapping {
                table_name: Some(identity.table_name.clone()),
                department: identity.department.clone(),
                product_code: identity.product_code.clone(),
                process_code: identity.process_code.clone(),
                process_name: identity.process_name.clone(),
                ..FreetextMapping::default()
            },
            None => {
                debug!("no registered table name found in text");
                FreetextMapping::default()
            }
        };

        mapping.lotno = extract_lotno(text);
        Ok(mapping)
    }
}

/// First registry entry whose table name appears in the text,
/// case-insensitively, in registry order.
pub fn match_identity<'a>(
    identities: &'a [TableIdentity],
    text: &str,
) -> Option<&'a TableIdentity> {
    let text_lower = text.to_lowercase();
    identities.iter().find(|identity| {
        !identity.table_name.is_empty()
            && text_lower.contains(&identity.table_name.to_lowercase())
    })
}

/// Extract a lot number: first a labeled `lotno` pattern, then the first
/// bare 8-12 character alphanumeric token, else the `-` sentinel.
pub fn extract_lotno(text: &str) -> String {
    static LABELED: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let labeled =
        LABELED.get_or_init(|| Regex::new(r"(?i)lotno[:\s=]+([A-Z0-9]{8,12})").unwrap());
    let bare = BARE.get_or_init(|| Regex::new(r"(?i)\b([A-Z0-9]{8,12})\b").unwrap());

    labeled
        .captures(text)
        .or_else(|| bare.captures(text))
        .map(|captures| captures[1].to_string())
        .unwrap_or_else(|| LOTNO_NOT_FOUND.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(table_name: &str, product: &str) -> TableIdentity {
        TableIdentity {
            table_name: table_name.into(),
            department: Some("MT900".into()),
            product_code: Some(product.into()),
            process_code: Some("Racking".into()),
            process_name: Some("Racking Process".into()),
        }
    }

    #[test]
    fn extracts_labeled_lotno_first() {
        let text = "rows for AAAA11112222 with lotno: 25XPB0062X pls";
        assert_eq!(extract_lotno(text), "25XPB0062X");
    }

    #[test]
    fn falls_back_to_bare_token() {
        assert_eq!(extract_lotno("Summary data of 25XPB0062"), "25XPB0062");
    }

    #[test]
    fn short_tokens_yield_sentinel() {
        // 2354ABC is only seven characters
        assert_eq!(
            extract_lotno("Get data about 2354ABC of Racking Process"),
            LOTNO_NOT_FOUND
        );
    }

    #[test]
    fn overlong_tokens_yield_sentinel() {
        assert_eq!(extract_lotno("id AAAA1111222233 is too long"), LOTNO_NOT_FOUND);
    }

    #[test]
    fn matches_table_name_case_insensitively() {
        let identities = vec![identity("PAC_1000", "PAC"), identity("RACKING_LINE", "RCK")];
        let found = match_identity(&identities, "Get data about 2354ABC of racking_line")
            .expect("should match");
        assert_eq!(found.table_name, "RACKING_LINE");
    }

    #[test]
    fn first_registry_match_wins() {
        let identities = vec![identity("PAC_1000", "PAC"), identity("PAC_1000_EXT", "PAC")];
        let found = match_identity(&identities, "pac_1000_ext please").expect("should match");
        // PAC_1000 is a substring of the text too and sits earlier in the registry
        assert_eq!(found.table_name, "PAC_1000");
    }

    #[test]
    fn no_match_leaves_identity_empty() {
        let identities = vec![identity("PAC_1000", "PAC")];
        assert!(match_identity(&identities, "nothing relevant here").is_none());
    }
}
