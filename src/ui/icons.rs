pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const LINK: &str = "🔗";
    pub const FILE: &str = "📄";
    pub const CLOCK: &str = "⏱️";
    pub const SPAGHETTI: &str = "🍝";
}
