use serde::{Serialize, Serializer};

/// Icon names stored alongside projects, tech stacks and interests.
///
/// Stored values come from an icon-font vocabulary (`fa-react`, `fa-music`)
/// or are short monograms (`N` for Next.js). Anything else resolves to
/// [`Icon::Unknown`] so the client can render a neutral placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    JavaScript,
    TypeScript,
    React,
    NodeJs,
    NextJs,
    Database,
    Code,
    Music,
    Book,
    Film,
    Camera,
    Robot,
    Skull,
    Glyph(String),
    Unknown(String),
}

impl Icon {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let normalized = trimmed.to_lowercase();
        let name = normalized.strip_prefix("fa-").unwrap_or(&normalized);

        match name {
            "js" | "javascript" | "js-square" => Self::JavaScript,
            "ts" | "typescript" => Self::TypeScript,
            "react" => Self::React,
            "node" | "nodejs" | "node-js" => Self::NodeJs,
            "nextjs" | "next-js" => Self::NextJs,
            "database" | "sql" => Self::Database,
            "code" => Self::Code,
            "music" => Self::Music,
            "book" => Self::Book,
            "film" | "movie" => Self::Film,
            "camera" => Self::Camera,
            "robot" => Self::Robot,
            "skull" | "skull-crossbones" => Self::Skull,
            _ if is_monogram(trimmed) => Self::Glyph(trimmed.to_string()),
            _ => Self::Unknown(trimmed.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::React => "react",
            Self::NodeJs => "nodejs",
            Self::NextJs => "nextjs",
            Self::Database => "database",
            Self::Code => "code",
            Self::Music => "music",
            Self::Book => "book",
            Self::Film => "film",
            Self::Camera => "camera",
            Self::Robot => "robot",
            Self::Skull => "skull",
            Self::Glyph(_) => "glyph",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Serialize for Icon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.kind())
    }
}

fn is_monogram(value: &str) -> bool {
    let count = value.chars().count();
    (1..=2).contains(&count) && value.chars().all(char::is_alphanumeric)
}
