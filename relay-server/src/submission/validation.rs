//! Field checks for contact-form submissions.
//!
//! The checks run in a fixed order and stop at the first failure, so a
//! request with several bad fields always reports the first one.

use super::error::{InvalidField, SubmissionError};
use super::types::{SubmissionRequest, ValidSubmission};

/// Minimum trimmed length of the submitter name.
pub const MIN_NAME_CHARS: usize = 2;

/// Minimum trimmed length of the message body.
pub const MIN_MESSAGE_CHARS: usize = 5;

/// Validate a raw submission.
///
/// Order: name, email, message, token. Name and message are returned trimmed;
/// the email is kept exactly as submitted.
pub fn validate(request: SubmissionRequest) -> Result<ValidSubmission, SubmissionError> {
    let name = request
        .name
        .as_deref()
        .map(trim_form_whitespace)
        .filter(|n| text_length(n) >= MIN_NAME_CHARS)
        .ok_or(SubmissionError::InvalidInput(InvalidField::Name))?
        .to_string();

    let email = request
        .email
        .filter(|e| is_valid_email(e))
        .ok_or(SubmissionError::InvalidInput(InvalidField::Email))?;

    let message = request
        .message
        .as_deref()
        .map(trim_form_whitespace)
        .filter(|m| text_length(m) >= MIN_MESSAGE_CHARS)
        .ok_or(SubmissionError::InvalidInput(InvalidField::Message))?
        .to_string();

    let token = request
        .token
        .filter(|t| !t.is_empty())
        .ok_or(SubmissionError::MissingToken)?;

    Ok(ValidSubmission {
        name,
        email,
        message,
        token,
    })
}

/// Whitespace as browsers see it: ECMAScript `WhiteSpace` and `LineTerminator`.
///
/// Differs from `char::is_whitespace`: includes U+FEFF, excludes U+0085.
pub fn is_form_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000A}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000D}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Trim leading and trailing [`is_form_whitespace`] characters.
pub fn trim_form_whitespace(s: &str) -> &str {
    s.trim_matches(is_form_whitespace)
}

/// Length in UTF-16 code units, the unit browsers count `maxlength` and
/// `String.length` in. Astral characters count twice.
pub fn text_length(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Loose email-shape check: `local@domain.tld`.
///
/// Accepts exactly what `^[^\s@]+@[^\s@]+\.[^\s@]+$` accepts: one `@`, no
/// whitespace anywhere, a non-empty local part, and a domain with at least
/// one dot that has characters on both sides. No TLD or label validation.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(is_form_whitespace) {
        return false;
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Some dot must have at least one char before and after it.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
