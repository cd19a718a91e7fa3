use chrono::{DateTime, Utc};
use shared::{
    domain::{Enterprise, EnterpriseKind},
    protocol::{Embed, EmbedField},
};

pub const ROSTER_TITLE: &str = "📊 Entreprises actives";
pub const ROSTER_COLOR: u32 = 0x00ff99;
pub const LEGAL_SECTION: &str = "✅ Entreprises légales";
pub const ILLEGAL_SECTION: &str = "🚫 Entreprises illégales";
pub const EMPTY_SECTION: &str = "Aucune";
pub const MISSING_DESCRIPTION: &str = "—";
pub const EMPTY_LIST: &str = "Aucune entreprise";

/// Platform cap on an embed field value, in characters.
pub const FIELD_VALUE_LIMIT: usize = 1024;
/// Platform cap on a message's text content, in characters.
pub const MESSAGE_CONTENT_LIMIT: usize = 2000;
/// Longest enterprise name echoed back in a confirmation.
pub const ECHOED_NAME_LIMIT: usize = 100;
const ELLIPSIS: char = '…';

/// Splits the roster by kind, keeping the incoming order inside each group.
pub fn partition(enterprises: &[Enterprise]) -> (Vec<&Enterprise>, Vec<&Enterprise>) {
    enterprises
        .iter()
        .partition(|enterprise| enterprise.kind == EnterpriseKind::Legal)
}

pub fn render_block(enterprise: &Enterprise) -> String {
    let description = if enterprise.description.is_empty() {
        MISSING_DESCRIPTION
    } else {
        enterprise.description.as_str()
    };
    format!(
        "🏢 **{}**\n👤 {}\n📝 {}",
        enterprise.name, enterprise.manager, description
    )
}

pub fn render_section(group: &[&Enterprise]) -> String {
    if group.is_empty() {
        return EMPTY_SECTION.to_string();
    }
    let blocks: Vec<String> = group.iter().map(|e| render_block(e)).collect();
    truncate_field(blocks.join("\n\n"))
}

/// The roster embed posted to the display channel.
pub fn render_roster(enterprises: &[Enterprise], rendered_at: DateTime<Utc>) -> Embed {
    let (legal, illegal) = partition(enterprises);
    Embed {
        title: ROSTER_TITLE.to_string(),
        color: ROSTER_COLOR,
        timestamp: Some(rendered_at),
        fields: vec![
            EmbedField {
                name: LEGAL_SECTION.to_string(),
                value: render_section(&legal),
                inline: false,
            },
            EmbedField {
                name: ILLEGAL_SECTION.to_string(),
                value: render_section(&illegal),
                inline: false,
            },
        ],
    }
}

/// Plain-text listing used by the list command. Lines that would push the
/// reply past [`MESSAGE_CONTENT_LIMIT`] are replaced by a final `…` line.
pub fn render_list(enterprises: &[Enterprise]) -> String {
    if enterprises.is_empty() {
        return EMPTY_LIST.to_string();
    }
    // Room for the "\n…" marker.
    let budget = MESSAGE_CONTENT_LIMIT - 2;
    let mut listing = String::new();
    let mut used = 0;
    for (index, enterprise) in enterprises.iter().enumerate() {
        let line = truncate_chars(
            format!("• {} ({})", enterprise.name, enterprise.kind),
            budget,
        );
        let cost = line.chars().count() + usize::from(index > 0);
        if used + cost > budget {
            listing.push('\n');
            listing.push(ELLIPSIS);
            return listing;
        }
        if index > 0 {
            listing.push('\n');
        }
        listing.push_str(&line);
        used += cost;
    }
    listing
}

/// Name as shown in add/remove confirmations.
pub fn echoed_name(name: &str) -> String {
    truncate_chars(name.to_string(), ECHOED_NAME_LIMIT)
}

fn truncate_field(value: String) -> String {
    truncate_chars(value, FIELD_VALUE_LIMIT)
}

/// Cuts `value` to at most `limit` characters, ending in `…` when shortened.
pub fn truncate_chars(value: String, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value;
    }
    let mut truncated: String = value.chars().take(limit.saturating_sub(1)).collect();
    truncated.push(ELLIPSIS);
    truncated
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
