use serde::Deserialize;

/// One person credit as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreditEntry {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Writer,
    Penciller,
    Inker,
    Colorist,
    Letterer,
    Editor,
    CoverArtist,
}

impl Role {
    /// Maps a catalog role tag (exact, case-sensitive) onto a record field.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "writer" => Some(Self::Writer),
            "penciler" => Some(Self::Penciller),
            "inker" => Some(Self::Inker),
            "colorist" => Some(Self::Colorist),
            "letterer" => Some(Self::Letterer),
            "editor" => Some(Self::Editor),
            "cover" => Some(Self::CoverArtist),
            _ => None,
        }
    }
}

/// Comma-joined names per role, ready to copy into a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCredits {
    pub writer: String,
    pub penciller: String,
    pub inker: String,
    pub colorist: String,
    pub letterer: String,
    pub editor: String,
    pub cover_artist: String,
}

impl RoleCredits {
    fn field_mut(&mut self, role: Role) -> &mut String {
        match role {
            Role::Writer => &mut self.writer,
            Role::Penciller => &mut self.penciller,
            Role::Inker => &mut self.inker,
            Role::Colorist => &mut self.colorist,
            Role::Letterer => &mut self.letterer,
            Role::Editor => &mut self.editor,
            Role::CoverArtist => &mut self.cover_artist,
        }
    }

    fn push(&mut self, role: Role, name: &str) {
        let field = self.field_mut(role);
        if !field.is_empty() {
            field.push(',');
        }
        field.push_str(name);
    }
}

/// Groups credits by role in source order and joins each group with `,`.
///
/// A tag may name several roles (`"penciler, inker"`); each part is matched on
/// its own. Parts outside the vocabulary are dropped.
pub fn aggregate_credits(entries: &[CreditEntry]) -> RoleCredits {
    let mut credits = RoleCredits::default();
    for entry in entries {
        for tag in entry.role.split(',').map(str::trim) {
            match Role::from_tag(tag) {
                Some(role) => credits.push(role, &entry.name),
                None => {
                    tracing::debug!(name = %entry.name, role = tag, "dropping unknown credit role");
                }
            }
        }
    }
    credits
}
