use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Signs pay links so a link handed to one user cannot be edited to
/// credit another user or another product.
#[derive(Clone)]
pub struct LinkSigner {
    keyed: HmacSha1,
}

impl LinkSigner {
    pub fn new(secret: &str) -> Result<Self, InvalidLength> {
        Ok(Self {
            keyed: HmacSha1::new_from_slice(secret.as_bytes())?,
        })
    }

    fn mac(&self, user_id: i64, sku: &str) -> HmacSha1 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{}:{}", user_id, sku).as_bytes());
        mac
    }

    pub fn sign(&self, user_id: i64, sku: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.mac(user_id, sku).finalize().into_bytes())
    }

    pub fn verify(&self, user_id: i64, sku: &str, signature: &str) -> bool {
        let expected = match URL_SAFE_NO_PAD.decode(signature.trim()) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        self.mac(user_id, sku).verify_slice(&expected).is_ok()
    }

    /// `{public_url}/pay/{sku}?uid=..&sig=..`
    pub fn pay_url(&self, public_url: &str, sku: &str, user_id: i64) -> String {
        format!(
            "{}/pay/{}?uid={}&sig={}",
            public_url,
            urlencoding::encode(sku),
            user_id,
            self.sign(user_id, sku)
        )
    }
}
