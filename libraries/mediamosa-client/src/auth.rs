//! DBUS_COOKIE_SHA1 login handshake.
//!
//! Round 1 announces the user and receives a challenge plus a session
//! cookie. Round 2 proves knowledge of the password by answering
//! `SHA1(challenge:nonce:password)`. The cookie becomes valid once the
//! server replies `OK server_guid`.

use crate::error::{MediaMosaError, Result};
use crate::response::RequestResult;
use crate::transport::{HttpMethod, HttpRequest, Transport};
use rand::RngCore;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/login";

/// Prefix of the round 1 `dbus` field; the challenge follows it.
const CHALLENGE_PREFIX: &str = "DATA vpx 0 ";
/// Round 2 `dbus` field on success.
const DBUS_SUCCESS: &str = "OK server_guid";
const NONCE_LEN: usize = 12;

/// Runs the login handshake for one set of credentials.
pub struct Authenticator<'a> {
    transport: &'a dyn Transport,
    user: &'a str,
    password: &'a str,
}

impl<'a> Authenticator<'a> {
    pub fn new(transport: &'a dyn Transport, user: &'a str, password: &'a str) -> Self {
        Self {
            transport,
            user,
            password,
        }
    }

    /// Perform both rounds and return the authenticated session cookie.
    ///
    /// Every failure is reported as [`MediaMosaError::AuthenticationFailed`];
    /// the underlying cause is logged and kept in the message.
    pub async fn login(&self) -> Result<String> {
        match self.handshake().await {
            Ok(cookie) => {
                info!(user = %self.user, "MediaMosa login successful");
                Ok(cookie)
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "MediaMosa login failed");
                Err(MediaMosaError::AuthenticationFailed(e.to_string()))
            }
        }
    }

    async fn handshake(&self) -> Result<String> {
        let (cookie, challenge) = self.start().await?;

        let nonce = generate_nonce();
        let dbus_status = self.answer(&cookie, &challenge, &nonce).await?;

        if dbus_status == DBUS_SUCCESS {
            Ok(cookie)
        } else {
            Err(MediaMosaError::AuthProtocol {
                code: crate::response::MM_OK.to_string(),
                description: format!("unexpected dbus status: {}", dbus_status),
            })
        }
    }

    /// Round 1: announce the user, receive cookie and challenge.
    async fn start(&self) -> Result<(String, String)> {
        let body = format!("dbus=AUTH DBUS_COOKIE_SHA1 {}", self.user);
        debug!(user = %self.user, "Starting dbus authentication");

        let request = HttpRequest::new(HttpMethod::Post, LOGIN_PATH).with_form_body(body);
        let response = self.transport.send(request).await?;

        let result = expect_ok(RequestResult::parse(&response.body)?)?;

        let cookie = response
            .header("set-cookie")
            .map(session_cookie)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| MediaMosaError::AuthProtocol {
                code: result.code_str().to_string(),
                description: "no Set-Cookie header in login response".to_string(),
            })?;

        let dbus = dbus_field(&result)?;
        let challenge = extract_challenge(dbus)?.to_string();

        debug!(challenge = %challenge, "Challenge received");
        Ok((cookie, challenge))
    }

    /// Round 2: answer the challenge, return the server's dbus status.
    async fn answer(&self, cookie: &str, challenge: &str, nonce: &str) -> Result<String> {
        let hash = challenge_response(challenge, nonce, self.password);
        let body = format!("dbus=DATA {} {}", nonce, hash);
        debug!(nonce = %nonce, "Sending challenge response");

        let request = HttpRequest::new(HttpMethod::Post, LOGIN_PATH)
            .with_form_body(body)
            .with_cookie(cookie);
        let response = self.transport.send(request).await?;

        let result = expect_ok(RequestResult::parse(&response.body)?)?;
        let status = dbus_field(&result)?.to_string();

        debug!(dbus_status = %status, "Challenge result");
        Ok(status)
    }
}

/// Hex SHA-1 of `challenge:nonce:password`.
pub fn challenge_response(challenge: &str, nonce: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(challenge.as_bytes());
    hasher.update(b":");
    hasher.update(nonce.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Random 12 character lowercase hex nonce.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Strip the `DATA vpx 0 ` prefix from a round 1 `dbus` field.
pub fn extract_challenge(dbus: &str) -> Result<&str> {
    dbus.strip_prefix(CHALLENGE_PREFIX)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| MediaMosaError::AuthProtocol {
            code: crate::response::MM_OK.to_string(),
            description: format!("malformed challenge: {}", dbus),
        })
}

/// `name=value` part of a Set-Cookie header.
///
/// Attributes (`path`, `expires`, `HttpOnly`) are dropped on purpose: the raw
/// header value is not echoed back, only the pair a `Cookie` header carries.
fn session_cookie(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn expect_ok(result: RequestResult) -> Result<RequestResult> {
    if result.is_ok() {
        Ok(result)
    } else {
        Err(MediaMosaError::AuthProtocol {
            code: result.code_str().to_string(),
            description: result.description,
        })
    }
}

fn dbus_field(result: &RequestResult) -> Result<&str> {
    result.first_field("dbus").map_err(|_| MediaMosaError::AuthProtocol {
        code: result.code_str().to_string(),
        description: "no dbus field in login response".to_string(),
    })
}
