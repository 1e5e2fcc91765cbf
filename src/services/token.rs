// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random data tokens and gift codes.
//!
//! Both draw 16 characters uniformly from `[A-Za-z0-9]`. Collisions are not
//! checked; with 62^16 possible values they are not expected in practice.

use rand::{distributions::Alphanumeric, Rng};

/// Characters in a data token or gift code (separators excluded).
pub const TOKEN_LENGTH: usize = 16;

/// Gift code group size.
const GIFT_CODE_GROUP: usize = 4;

/// Generate an opaque data token, e.g. `aZ3k9QpL0xWm2VbN`.
pub fn generate_token() -> String {
    random_alphanumeric(TOKEN_LENGTH)
}

/// Generate a gift code grouped by four, e.g. `aZ3k-9QpL-0xWm-2VbN`.
pub fn generate_gift_code() -> String {
    let raw = random_alphanumeric(TOKEN_LENGTH);
    let mut code = String::with_capacity(TOKEN_LENGTH + TOKEN_LENGTH / GIFT_CODE_GROUP);

    for (i, c) in raw.chars().enumerate() {
        if i > 0 && i % GIFT_CODE_GROUP == 0 {
            code.push('-');
        }
        code.push(c);
    }
    code
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Short prefix of a token, safe to put in logs.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…", prefix)
}
