use crate::database::DatabaseError;
use crate::payments::PaymentError;

pub const GENERIC_ERROR: &str = "❌ Da ist etwas schiefgelaufen. Bitte versuche es später erneut.";

pub fn map_database_error_to_user_message(error: &DatabaseError) -> String {
    match error {
        DatabaseError::UserNotFound => {
            "❌ Keine Daten gefunden. Bitte starte den Bot mit /start.".to_string()
        }
        _ => GENERIC_ERROR.to_string(),
    }
}

pub fn map_payment_error_to_user_message(error: &PaymentError) -> String {
    match error {
        PaymentError::Api { status: 422, .. } => {
            "ℹ️ Diese Zahlung wurde bereits verarbeitet.".to_string()
        }
        PaymentError::MissingCredentials => {
            "❌ Zahlungen sind gerade nicht verfügbar. Bitte schreib mir direkt.".to_string()
        }
        PaymentError::Http(_) | PaymentError::Api { .. } => {
            "❌ PayPal ist gerade nicht erreichbar. Bitte versuche es später erneut.".to_string()
        }
        _ => GENERIC_ERROR.to_string(),
    }
}
