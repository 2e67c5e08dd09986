use crate::{error::AppError, middleware::auth::SessionContext, state::AppState};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use cresta_order::Receipt;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/receipts/{id}", get(get_receipt))
        .route("/receipts/{id}/pdf", get(get_receipt_pdf))
}

async fn get_receipt(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(owned_receipt(&state, &session, id)?))
}

async fn get_receipt_pdf(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let receipt = owned_receipt(&state, &session, id)?;
    let filename = format!("attachment; filename=\"{}.pdf\"", receipt.number);
    let body = render_pdf(&receipt);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    )
        .into_response())
}

/// Receipts inherit their owner from the hold they settle.
fn owned_receipt(
    state: &AppState,
    session: &SessionContext,
    receipt_id: Uuid,
) -> Result<Receipt, AppError> {
    let receipt = state
        .orders
        .receipt(receipt_id)
        .map_err(AppError::from_order)?;
    let hold = state
        .holds
        .get(receipt.hold_id)
        .map_err(AppError::from_hold)?;
    if hold.user_id != session.user_id {
        return Err(AppError::AuthorizationError(
            "Receipt does not belong to you".to_string(),
        ));
    }
    Ok(receipt)
}

/// Render the receipt as a single-page PDF 1.4 document.
///
/// Hand-rolled on purpose: the output is one Helvetica text block, and the
/// whole format fits in five objects plus a cross-reference table. All
/// content is ASCII, so byte offsets and string offsets agree.
fn render_pdf(receipt: &Receipt) -> Vec<u8> {
    let amount = receipt.amount_minor as f64 / 100.0;
    let lines = [
        "Cresta Villas".to_string(),
        "Purchase receipt".to_string(),
        String::new(),
        format!("Receipt no.   {}", receipt.number),
        format!("Issued        {}", receipt.issued_at.format("%Y-%m-%d %H:%M UTC")),
        format!("Unit          {}", receipt.unit_code),
        format!("Buyer         {}", receipt.buyer_name.as_deref().unwrap_or("-")),
        format!("Amount        {:.2} {}", amount, receipt.currency),
        String::new(),
        format!("Order         {}", receipt.order_id),
        format!("Reservation   {}", receipt.hold_id),
    ];

    let mut content = String::from("BT\n/F1 12 Tf\n16 TL\n72 770 Td\n");
    for line in &lines {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({}) Tj\nT*\n", escaped));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_at = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        out.push_str(&format!("{:010} 00000 n \n", offset));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));

    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn receipt() -> Receipt {
        Receipt {
            id: Uuid::new_v4(),
            number: "CR-2025-ABCDEF".to_string(),
            order_id: Uuid::new_v4(),
            hold_id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            unit_code: "V-01 (sea)".to_string(),
            buyer_name: Some("Ana Petrova".to_string()),
            amount_minor: 185_000_000,
            currency: "EUR".to_string(),
            issued_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_pdf_framing() {
        let bytes = render_pdf(&receipt());
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("CR-2025-ABCDEF"));
        assert!(text.contains("1850000.00 EUR"));
        // parens in the unit code must be escaped inside the text operator
        assert!(text.contains("V-01 \\(sea\\)"));
    }

    #[test]
    fn test_pdf_xref_offsets_are_exact() {
        let bytes = render_pdf(&receipt());
        let text = String::from_utf8(bytes).unwrap();

        let xref_at = text.find("xref\n").unwrap();
        let entries: Vec<&str> = text[xref_at..]
            .lines()
            .skip(3) // "xref", "0 6", the free entry
            .take(5)
            .collect();
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(
                text[offset..].starts_with(&format!("{} 0 obj", i + 1)),
                "object {} offset points at {:?}",
                i + 1,
                &text[offset..offset + 12]
            );
        }

        let startxref = text.rfind("startxref\n").unwrap();
        let recorded: usize = text[startxref + 10..].lines().next().unwrap().parse().unwrap();
        assert_eq!(recorded, xref_at);
    }
}
