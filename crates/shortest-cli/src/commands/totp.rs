//! GitHub 2FA codes (RFC 6238 TOTP, HMAC-SHA1, 30 second step, 6 digits)

use anyhow::{anyhow, bail, Result};
use colored::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;

const STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;

/// A generated code and how long it stays valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totp {
    pub code: String,
    pub expires_in: u64,
}

/// Print a code for `secret` and its remaining lifetime
pub fn run(secret: Option<&str>) -> Result<()> {
    let secret = secret.ok_or_else(|| {
        anyhow!("no TOTP secret: pass --secret or set GITHUB_TOTP_SECRET")
    })?;
    let now = u64::try_from(chrono::Utc::now().timestamp())?;
    let totp = generate(secret, now)?;

    println!("{} {}", "GitHub 2FA code:".bold(), totp.code.green().bold());
    println!("{}", format!("Expires in {}s", totp.expires_in).dimmed());
    Ok(())
}

/// Compute the code for `secret` (base32) at unix time `now`
pub fn generate(secret: &str, now: u64) -> Result<Totp> {
    let key = decode_base32(secret)?;
    let counter = now / STEP_SECS;

    let mut mac = Hmac::<Sha1>::new_from_slice(&key)
        .map_err(|e| anyhow!("invalid TOTP key: {}", e))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation
    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = binary % 10u32.pow(DIGITS);

    Ok(Totp {
        code: format!("{:0width$}", code, width = DIGITS as usize),
        expires_in: STEP_SECS - now % STEP_SECS,
    })
}

/// RFC 4648 base32; case, spaces, dashes and `=` padding are ignored
fn decode_base32(secret: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(secret.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for c in secret.chars().filter(|c| !matches!(c, ' ' | '-' | '=')) {
        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u32 - 'A' as u32,
            c @ '2'..='7' => c as u32 - '2' as u32 + 26,
            other => bail!("invalid character '{}' in TOTP secret", other),
        };
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            bytes.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    if bytes.is_empty() {
        bail!("TOTP secret is empty");
    }
    Ok(bytes)
}
