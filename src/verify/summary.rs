//! Welcome summary composition.

use crate::verify::session::MemberProfile;

/// Compose the shared-channel welcome text.
///
/// `None` when no descriptive field was captured; the flow posts nothing in
/// that case. Only non-empty answers appear, in question order, under a
/// header carrying the captured name (or the user's handle as fallback).
pub fn compose(profile: &MemberProfile, fallback_name: &str) -> Option<String> {
    if !profile.has_details() {
        return None;
    }

    let name = profile
        .display_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback_name);

    let mut lines = vec![format!("🎉 Welcome {name}!")];
    for answer in profile.answers.iter().filter(|a| !a.text.is_empty()) {
        lines.push(format!("**{}:** {}", answer.label, answer.text));
    }
    Some(lines.join("\n"))
}
