use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Proof of sale, issued exactly once per successful order. Immutable after
/// issue; the snapshot of unit and buyer is deliberate so later catalog
/// edits cannot rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,
    pub number: String,
    pub order_id: Uuid,
    pub hold_id: Uuid,
    pub unit_id: Uuid,
    pub unit_code: String,
    pub buyer_name: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

/// Human-readable receipt number, `CR-<year>-<6 chars>`. The charset skips
/// look-alike characters (0/O, 1/I/L) so the number survives being read
/// over the phone.
pub fn generate_receipt_number(issued_at: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("CR-{}-{}", issued_at.format("%Y"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_receipt_number_shape() {
        let issued = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let number = generate_receipt_number(issued);

        assert!(number.starts_with("CR-2025-"));
        let suffix = number.strip_prefix("CR-2025-").unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!suffix.contains('0') && !suffix.contains('O'));
        assert!(!suffix.contains('1') && !suffix.contains('I') && !suffix.contains('L'));
    }
}
