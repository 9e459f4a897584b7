use epg_common::{Cents, CentsConversionError, Secret};
use serde::{Deserialize, Serialize};

use crate::checksum::verify_md5sig;

/// The terminal (or near-terminal) outcome the gateway reports for a payment attempt.
///
/// PayHere's notification `status_code` values:
///
/// | code | meaning     |
/// |------|-------------|
/// |  2   | success     |
/// |  0   | pending     |
/// | -1   | canceled    |
/// | -2   | failed      |
/// | -3   | chargedback |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Success,
    Pending,
    Canceled,
    Failed,
    Chargedback,
}

impl PaymentOutcome {
    pub fn from_status_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(Self::Success),
            0 => Some(Self::Pending),
            -1 => Some(Self::Canceled),
            -2 => Some(Self::Failed),
            -3 => Some(Self::Chargedback),
            _ => None,
        }
    }

    pub fn status_code(&self) -> i32 {
        match self {
            Self::Success => 2,
            Self::Pending => 0,
            Self::Canceled => -1,
            Self::Failed => -2,
            Self::Chargedback => -3,
        }
    }
}

/// A server-to-server payment notification (IPN), exactly as PayHere POSTs it, form-encoded, to
/// the notify url. Amounts are kept verbatim as strings; [`IpnNotification::amount`] parses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpnNotification {
    pub merchant_id: String,
    pub order_id: String,
    pub payment_id: String,
    pub payhere_amount: String,
    pub payhere_currency: String,
    pub status_code: i32,
    pub md5sig: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub card_holder_name: Option<String>,
    #[serde(default)]
    pub card_no: Option<String>,
    #[serde(default)]
    pub custom_1: Option<String>,
    #[serde(default)]
    pub custom_2: Option<String>,
}

impl IpnNotification {
    pub fn amount(&self) -> Result<Cents, CentsConversionError> {
        Cents::parse_decimal(&self.payhere_amount)
    }

    pub fn outcome(&self) -> Option<PaymentOutcome> {
        PaymentOutcome::from_status_code(self.status_code)
    }

    /// Recomputes the checksum over the notification's own fields and compares it with the
    /// supplied `md5sig`. An unparseable amount can never verify.
    pub fn verify_signature(&self, merchant_secret: &Secret<String>) -> bool {
        let Ok(amount) = self.amount() else {
            return false;
        };
        verify_md5sig(
            &self.merchant_id,
            &self.order_id,
            amount,
            &self.payhere_currency,
            self.status_code,
            &self.md5sig,
            merchant_secret,
        )
    }
}

/// One payment as returned by the Payment Retrieval API (`/merchant/v1/payment/search`). Only the
/// fields the reconciliation path needs are modelled; the full JSON is available to callers as the
/// raw response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPayment {
    pub payment_id: i64,
    pub order_id: String,
    /// PayHere reports retrieval status as a word: "RECEIVED", "PENDING", "CANCELED", "FAILED" or
    /// "CHARGEDBACK".
    pub status: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub method: Option<String>,
}

impl RetrievedPayment {
    pub fn outcome(&self) -> Option<PaymentOutcome> {
        match self.status.to_uppercase().as_str() {
            "RECEIVED" => Some(PaymentOutcome::Success),
            "PENDING" => Some(PaymentOutcome::Pending),
            "CANCELED" => Some(PaymentOutcome::Canceled),
            "FAILED" => Some(PaymentOutcome::Failed),
            "CHARGEDBACK" => Some(PaymentOutcome::Chargedback),
            _ => None,
        }
    }

    /// The retrieval API reports amounts as decimal numbers rather than strings.
    pub fn amount_cents(&self) -> Option<Cents> {
        self.amount.map(|a| Cents::from((a * 100.0).round() as i64))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::checksum::local_md5sig;

    fn signed_notification(secret: &Secret<String>) -> IpnNotification {
        let amount = Cents::from_rupees(8000);
        let md5sig = local_md5sig("1211149", "EPG-2001", amount, "LKR", 2, secret);
        IpnNotification {
            merchant_id: "1211149".to_string(),
            order_id: "EPG-2001".to_string(),
            payment_id: "320025471".to_string(),
            payhere_amount: amount.to_decimal_string(),
            payhere_currency: "LKR".to_string(),
            status_code: 2,
            md5sig,
            status_message: Some("Successfully completed the payment.".to_string()),
            method: Some("VISA".to_string()),
            card_holder_name: Some("S. Perera".to_string()),
            card_no: Some("************1292".to_string()),
            custom_1: None,
            custom_2: None,
        }
    }

    #[test]
    fn valid_notification_verifies() {
        let secret = Secret::new("sekrit".to_string());
        let n = signed_notification(&secret);
        assert!(n.verify_signature(&secret));
        assert_eq!(n.outcome(), Some(PaymentOutcome::Success));
        assert_eq!(n.amount().unwrap(), Cents::from_rupees(8000));
    }

    #[test]
    fn tampered_amount_does_not_verify() {
        let secret = Secret::new("sekrit".to_string());
        let mut n = signed_notification(&secret);
        n.payhere_amount = "8000.01".to_string();
        assert!(!n.verify_signature(&secret));
    }

    #[test]
    fn unparseable_amount_does_not_verify() {
        let secret = Secret::new("sekrit".to_string());
        let mut n = signed_notification(&secret);
        n.payhere_amount = "8,000.00".to_string();
        assert!(!n.verify_signature(&secret));
    }

    #[test]
    fn unknown_status_codes_have_no_outcome() {
        assert_eq!(PaymentOutcome::from_status_code(3), None);
        assert_eq!(PaymentOutcome::from_status_code(-4), None);
        for outcome in
            [PaymentOutcome::Success, PaymentOutcome::Pending, PaymentOutcome::Canceled, PaymentOutcome::Failed, PaymentOutcome::Chargedback]
        {
            assert_eq!(PaymentOutcome::from_status_code(outcome.status_code()), Some(outcome));
        }
    }

    #[test]
    fn retrieval_status_words_map_to_outcomes() {
        let mut p = RetrievedPayment {
            payment_id: 320025471,
            order_id: "EPG-2001".to_string(),
            status: "RECEIVED".to_string(),
            currency: Some("LKR".to_string()),
            amount: Some(8000.0),
            method: Some("VISA".to_string()),
        };
        assert_eq!(p.outcome(), Some(PaymentOutcome::Success));
        assert_eq!(p.amount_cents(), Some(Cents::from_rupees(8000)));
        p.status = "chargedback".to_string();
        assert_eq!(p.outcome(), Some(PaymentOutcome::Chargedback));
        p.status = "UNHEARD_OF".to_string();
        assert_eq!(p.outcome(), None);
    }
}
