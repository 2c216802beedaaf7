use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// 携带签名的请求头
pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// 验证 webhook 签名：base64(HMAC-SHA256(channel secret, 原始请求体))
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    // 常数时间比较
    mac.verify_slice(&expected).is_ok()
}

/// 计算签名，供测试与本地调试使用
pub fn sign(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"events":[]}"#;
        let signature = sign("channel-secret", body).unwrap();
        assert!(verify_signature("channel-secret", body, &signature));
    }

    #[test]
    fn rejects_tampered_body_or_wrong_secret() {
        let body = br#"{"events":[]}"#;
        let signature = sign("channel-secret", body).unwrap();
        assert!(!verify_signature("channel-secret", br#"{"events":[1]}"#, &signature));
        assert!(!verify_signature("another-secret", body, &signature));
    }

    #[test]
    fn rejects_non_base64_signature() {
        assert!(!verify_signature("channel-secret", b"{}", "not base64!!"));
    }
}
