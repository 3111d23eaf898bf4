//! Shared UI icons.
//!
//! Each icon falls back to ASCII on terminals without emoji support.

use console::Emoji;

use crate::reconcile::StageStatus;
use crate::stage::{Actor, StageName};

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[X]");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static PENDING: Emoji<'_, '_> = Emoji("⏳ ", "[ ]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Stage indicators
pub static REQUEST: Emoji<'_, '_> = Emoji("📝 ", "[REQ]");
pub static ANALYSIS: Emoji<'_, '_> = Emoji("🤖 ", "[AI]");
pub static APPROVAL: Emoji<'_, '_> = Emoji("👤 ", "[HUM]");
pub static SYSTEM: Emoji<'_, '_> = Emoji("🏢 ", "[SAP]");
pub static NOTIFY: Emoji<'_, '_> = Emoji("📧 ", "[MSG]");

pub fn stage_icon(stage: StageName) -> &'static Emoji<'static, 'static> {
    match stage {
        StageName::RequestSubmitted => &REQUEST,
        StageName::AIAnalysis => &ANALYSIS,
        StageName::HumanApproval => &APPROVAL,
        StageName::SystemUpdate => &SYSTEM,
        StageName::Notification => &NOTIFY,
    }
}

pub fn status_icon(status: StageStatus) -> &'static Emoji<'static, 'static> {
    match status {
        StageStatus::Pending => &PENDING,
        StageStatus::InProgress => &RUNNING,
        StageStatus::Completed => &CHECK,
        StageStatus::Rejected => &CROSS,
    }
}

pub fn actor_icon(actor: Actor) -> &'static Emoji<'static, 'static> {
    match actor {
        Actor::AI => &ANALYSIS,
        Actor::Human => &APPROVAL,
        Actor::System => &SYSTEM,
    }
}
