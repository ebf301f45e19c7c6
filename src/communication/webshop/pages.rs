use crate::payments::FulfilmentOutcome;
use axum::response::Html;
use teloxide::utils::html::escape;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="de">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>body{{font-family:sans-serif;max-width:32rem;margin:4rem auto;padding:0 1rem;text-align:center}}</style>
</head>
<body>
<h1>{title}</h1>
{body}
<p>Du kannst dieses Fenster jetzt schließen und zurück zu Telegram gehen.</p>
</body>
</html>"#,
        title = escape(title),
        body = body,
    ))
}

pub fn error(message: &str) -> Html<String> {
    page("Fehler", &format!("<p>{}</p>", escape(message)))
}

pub fn success() -> Html<String> {
    page(
        "✅ Zahlung erfolgreich",
        "<p>Danke! Deine Bestätigung kommt gleich im Bot.</p>",
    )
}

pub fn cancel() -> Html<String> {
    page(
        "Zahlung abgebrochen",
        "<p>Es wurde nichts abgebucht. Du kannst jederzeit im Bot neu starten.</p>",
    )
}

pub fn return_result(outcome: &FulfilmentOutcome) -> Html<String> {
    match outcome {
        FulfilmentOutcome::Activated(grant) => {
            let validity = match (&grant.status, grant.status_end) {
                (Some(status), Some(end)) => format!(
                    "<p>Status <b>{}</b> gültig bis {}.</p>",
                    escape(status),
                    end.format("%d.%m.%Y")
                ),
                (Some(status), None) => {
                    format!("<p>Status <b>{}</b> ohne Ablauf.</p>", escape(status))
                }
                (None, _) => String::new(),
            };
            page(
                "✅ Zahlung erfolgreich",
                &format!(
                    "<p>{} ist freigeschaltet.</p>{}<p>+{} Punkte</p>",
                    escape(&grant.product_name),
                    validity,
                    grant.points
                ),
            )
        }
        FulfilmentOutcome::Duplicate => page(
            "✅ Zahlung erfolgreich",
            "<p>Diese Zahlung ist bereits verbucht.</p>",
        ),
        FulfilmentOutcome::NotCompleted(status) => page(
            "Zahlung in Prüfung",
            &format!(
                "<p>PayPal meldet den Status {}. Wir schalten frei, sobald das Geld da ist.</p>",
                escape(status)
            ),
        ),
        FulfilmentOutcome::UnknownSku(_) | FulfilmentOutcome::AmountMismatch { .. } => error(
            "Die Zahlung passt zu keinem Produkt. Bitte schreib mir direkt, ich kümmere mich darum.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::PurchaseGrant;
    use chrono::NaiveDate;

    #[test]
    fn test_activation_page_shows_validity() {
        let grant = PurchaseGrant {
            capture_id: "CAP-1".to_string(),
            user_id: 123,
            sku: "VIP_PASS".to_string(),
            product_name: "VIP Pass".to_string(),
            status: Some("VIP".to_string()),
            status_start: NaiveDate::from_ymd_opt(2026, 10, 18),
            status_end: NaiveDate::from_ymd_opt(2026, 11, 17),
            points: 6,
            amount_cents: 4000,
            currency: "EUR".to_string(),
        };

        let Html(body) = return_result(&FulfilmentOutcome::Activated(grant));
        assert!(body.contains("VIP Pass ist freigeschaltet"));
        assert!(body.contains("17.11.2026"));
        assert!(body.contains("+6 Punkte"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let Html(body) = error("<script>");
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }
}
