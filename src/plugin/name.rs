//! Canonical interface names
//!
//! Interfaces are looked up by a string key. The key for a type is derived
//! from the identifier the compiler gives it (`std::any::type_name`) or from a
//! symbol exported by a plugin library, so the same interface can arrive here
//! decorated in different ways:
//!
//! - `dyn my_crate::Shape` vs `my_crate::Shape`
//! - `::my_crate::Shape` vs `my_crate::Shape`
//! - `Vec< u8 >` vs `Vec<u8>`
//! - `_ZN8my_crate5ShapeE` (legacy mangled symbol) vs `my_crate::Shape`
//!
//! [`normalize`] maps all of these onto one canonical form. When a mangled
//! identifier cannot be decoded the cleaned raw identifier is used as the key:
//! it is unreadable but still unique.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// What to do when a mangled identifier cannot be demangled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log a warning and fall back to the raw identifier
    #[default]
    Log,
    /// Panic. Meant for development builds where a bad symbol is a bug.
    Panic,
}

static PANIC_ON_FAILURE: AtomicBool = AtomicBool::new(false);

/// Set the process-wide demangling failure policy
pub fn set_failure_policy(policy: FailurePolicy) {
    PANIC_ON_FAILURE.store(policy == FailurePolicy::Panic, Ordering::Relaxed);
}

/// Get the process-wide demangling failure policy
pub fn failure_policy() -> FailurePolicy {
    if PANIC_ON_FAILURE.load(Ordering::Relaxed) {
        FailurePolicy::Panic
    } else {
        FailurePolicy::Log
    }
}

/// Raw identifier of `T` as reported by the compiler
pub fn symbol_of<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// Canonical name of `T`
pub fn interface_name_of<T: ?Sized>() -> String {
    normalize(symbol_of::<T>())
}

/// Canonicalize a raw type identifier.
///
/// Total and idempotent: `normalize(&normalize(x)) == normalize(x)` for every
/// input.
pub fn normalize(raw: &str) -> String {
    let cleaned = clean(raw);
    if !looks_mangled(&cleaned) {
        return cleaned;
    }

    match demangle(&cleaned) {
        Some(demangled) => {
            let demangled = clean(&demangled);
            if demangled.is_empty() || looks_mangled(&demangled) {
                report_failure(&cleaned, "demangled identifier is not a plain path");
                cleaned
            } else {
                demangled
            }
        }
        None => {
            report_failure(&cleaned, "malformed mangled identifier");
            cleaned
        }
    }
}

fn report_failure(raw: &str, reason: &str) {
    if PANIC_ON_FAILURE.load(Ordering::Relaxed) {
        panic!("failed to demangle interface name [{}]: {}", raw, reason);
    }
    tracing::warn!(
        name = %raw,
        reason = %reason,
        "Failed to demangle interface name, using the raw identifier"
    );
}

/// Apply [`clean_once`] until nothing changes
fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(raw: &str) -> String {
    let mut name = raw.trim();
    while let Some(rest) = ["::", "dyn ", "class ", "struct "]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
    {
        name = rest.trim_start();
    }

    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() && !is_tight(ch) && !out.ends_with(is_tight) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// Punctuation that never takes surrounding whitespace in a canonical name
fn is_tight(ch: char) -> bool {
    matches!(ch, ':' | '<' | '>' | ',' | '(' | ')' | '[' | ']')
}

fn looks_mangled(name: &str) -> bool {
    name.starts_with("_ZN") || name.starts_with("__ZN")
}

/// Decode a legacy (`_ZN...E`) mangled path.
fn demangle(symbol: &str) -> Option<String> {
    let mut rest = symbol
        .strip_prefix("__ZN")
        .or_else(|| symbol.strip_prefix("_ZN"))?;

    let mut segments = Vec::new();
    loop {
        if let Some(tail) = rest.strip_prefix('E') {
            // LLVM may append `.llvm.1234` style suffixes
            if !tail.is_empty() && !tail.starts_with('.') {
                return None;
            }
            break;
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let len: usize = rest[..digits].parse().ok()?;
        let end = digits.checked_add(len)?;
        segments.push(rest.get(digits..end)?);
        rest = &rest[end..];
    }

    if segments.last().is_some_and(|last| is_hash(last)) {
        segments.pop();
    }
    if segments.is_empty() {
        return None;
    }

    let decoded = segments
        .into_iter()
        .map(decode_segment)
        .collect::<Option<Vec<_>>>()?;
    Some(decoded.join("::"))
}

fn is_hash(segment: &str) -> bool {
    segment.len() == 17
        && segment.starts_with('h')
        && segment[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn decode_segment(segment: &str) -> Option<String> {
    let mut rest = if segment.starts_with("_$") {
        &segment[1..]
    } else {
        segment
    };

    let mut out = String::with_capacity(rest.len());
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('$') {
            let close = tail.find('$')?;
            let decoded = match &tail[..close] {
                "SP" => '@',
                "BP" => '*',
                "RF" => '&',
                "LT" => '<',
                "GT" => '>',
                "LP" => '(',
                "RP" => ')',
                "C" => ',',
                escape => {
                    let hex = escape.strip_prefix('u')?;
                    char::from_u32(u32::from_str_radix(hex, 16).ok()?)?
                }
            };
            out.push(decoded);
            rest = &tail[close + 1..];
        } else if let Some(tail) = rest.strip_prefix("..") {
            out.push_str("::");
            rest = tail;
        } else {
            let ch = rest.chars().next()?;
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    Some(out)
}
