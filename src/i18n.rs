use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
    De,
}

impl Locale {
    pub const ALL: [Self; 3] = [Self::En, Self::Es, Self::De];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::De => "de",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "en" | "english" | "en-us" | "en_us" => Some(Self::En),
            "es" | "spanish" | "espanol" | "español" => Some(Self::Es),
            "de" | "german" | "deutsch" => Some(Self::De),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|locale| *locale == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Message keys for every translated string shown by the console.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Msg {
    MenuResources,
    MenuActions,
    Workloads,
    Services,
    Namespaces,
    Clusters,
    CreateWorkload,
    Summary,
    Events,
    Logs,
    Manifest,
    Live,
    Diff,
    Desired,
    EventsUnavailable,
    LogsUnavailable,
    Loading,
    Status,
    Health,
    Synced,
    OutOfSync,
    Healthy,
    Degraded,
    Members,
    NoRows,
    SignIn,
    Username,
    Password,
    PublicNotice,
    Editor,
    Upload,
    Repository,
    FilePath,
    RepoUrl,
    FolderPath,
    Branch,
    WorkloadLabel,
    Submit,
    Submitting,
    Valid,
    Invalid,
}

pub fn tr(locale: Locale, msg: Msg) -> &'static str {
    match locale {
        Locale::En => english(msg),
        Locale::Es => spanish(msg),
        Locale::De => german(msg),
    }
}

fn english(msg: Msg) -> &'static str {
    match msg {
        Msg::MenuResources => "Resources",
        Msg::MenuActions => "Actions",
        Msg::Workloads => "Workloads",
        Msg::Services => "Services",
        Msg::Namespaces => "Namespaces",
        Msg::Clusters => "Clusters",
        Msg::CreateWorkload => "Create workload",
        Msg::Summary => "Summary",
        Msg::Events => "Events",
        Msg::Logs => "Logs",
        Msg::Manifest => "Manifest",
        Msg::Live => "Live",
        Msg::Diff => "Diff",
        Msg::Desired => "Desired",
        Msg::EventsUnavailable => "Events unavailable",
        Msg::LogsUnavailable => "Logs unavailable",
        Msg::Loading => "Loading…",
        Msg::Status => "Status",
        Msg::Health => "Health",
        Msg::Synced => "Synced",
        Msg::OutOfSync => "Out of Sync",
        Msg::Healthy => "Healthy",
        Msg::Degraded => "Degraded",
        Msg::Members => "Members",
        Msg::NoRows => "Nothing to show",
        Msg::SignIn => "Sign in",
        Msg::Username => "Username",
        Msg::Password => "Password",
        Msg::PublicNotice => "Not signed in. Enter credentials to continue.",
        Msg::Editor => "Editor",
        Msg::Upload => "Upload file",
        Msg::Repository => "From repository",
        Msg::FilePath => "File path",
        Msg::RepoUrl => "Repository URL",
        Msg::FolderPath => "Folder path",
        Msg::Branch => "Branch",
        Msg::WorkloadLabel => "Workload label",
        Msg::Submit => "Ctrl+S apply",
        Msg::Submitting => "Applying",
        Msg::Valid => "valid",
        Msg::Invalid => "invalid",
    }
}

fn spanish(msg: Msg) -> &'static str {
    match msg {
        Msg::MenuResources => "Recursos",
        Msg::MenuActions => "Acciones",
        Msg::Workloads => "Cargas de trabajo",
        Msg::Services => "Servicios",
        Msg::Namespaces => "Espacios de nombres",
        Msg::Clusters => "Clústeres",
        Msg::CreateWorkload => "Crear carga",
        Msg::Summary => "Resumen",
        Msg::Events => "Eventos",
        Msg::Logs => "Registros",
        Msg::Manifest => "Manifiesto",
        Msg::Live => "Actual",
        Msg::Diff => "Diferencias",
        Msg::Desired => "Deseado",
        Msg::EventsUnavailable => "Eventos no disponibles",
        Msg::LogsUnavailable => "Registros no disponibles",
        Msg::Loading => "Cargando…",
        Msg::Status => "Estado",
        Msg::Health => "Salud",
        Msg::Synced => "Sincronizado",
        Msg::OutOfSync => "Desincronizado",
        Msg::Healthy => "Saludable",
        Msg::Degraded => "Degradado",
        Msg::Members => "Miembros",
        Msg::NoRows => "Nada que mostrar",
        Msg::SignIn => "Iniciar sesión",
        Msg::Username => "Usuario",
        Msg::Password => "Contraseña",
        Msg::PublicNotice => "Sesión no iniciada. Introduce tus credenciales.",
        Msg::Editor => "Editor",
        Msg::Upload => "Subir archivo",
        Msg::Repository => "Desde repositorio",
        Msg::FilePath => "Ruta del archivo",
        Msg::RepoUrl => "URL del repositorio",
        Msg::FolderPath => "Carpeta",
        Msg::Branch => "Rama",
        Msg::WorkloadLabel => "Etiqueta",
        Msg::Submit => "Ctrl+S aplicar",
        Msg::Submitting => "Aplicando",
        Msg::Valid => "válido",
        Msg::Invalid => "inválido",
    }
}

fn german(msg: Msg) -> &'static str {
    match msg {
        Msg::MenuResources => "Ressourcen",
        Msg::MenuActions => "Aktionen",
        Msg::Workloads => "Workloads",
        Msg::Services => "Services",
        Msg::Namespaces => "Namespaces",
        Msg::Clusters => "Cluster",
        Msg::CreateWorkload => "Workload erstellen",
        Msg::Summary => "Übersicht",
        Msg::Events => "Ereignisse",
        Msg::Logs => "Logs",
        Msg::Manifest => "Manifest",
        Msg::Live => "Live",
        Msg::Diff => "Diff",
        Msg::Desired => "Soll",
        Msg::EventsUnavailable => "Ereignisse nicht verfügbar",
        Msg::LogsUnavailable => "Logs nicht verfügbar",
        Msg::Loading => "Lädt…",
        Msg::Status => "Status",
        Msg::Health => "Zustand",
        Msg::Synced => "Synchron",
        Msg::OutOfSync => "Nicht synchron",
        Msg::Healthy => "Gesund",
        Msg::Degraded => "Beeinträchtigt",
        Msg::Members => "Mitglieder",
        Msg::NoRows => "Keine Einträge",
        Msg::SignIn => "Anmelden",
        Msg::Username => "Benutzername",
        Msg::Password => "Passwort",
        Msg::PublicNotice => "Nicht angemeldet. Bitte Zugangsdaten eingeben.",
        Msg::Editor => "Editor",
        Msg::Upload => "Datei hochladen",
        Msg::Repository => "Aus Repository",
        Msg::FilePath => "Dateipfad",
        Msg::RepoUrl => "Repository-URL",
        Msg::FolderPath => "Ordner",
        Msg::Branch => "Branch",
        Msg::WorkloadLabel => "Workload-Label",
        Msg::Submit => "Strg+S anwenden",
        Msg::Submitting => "Wird angewendet",
        Msg::Valid => "gültig",
        Msg::Invalid => "ungültig",
    }
}

#[cfg(test)]
mod tests {
    use super::{Locale, Msg, tr};

    #[test]
    fn locale_tokens_resolve() {
        assert_eq!(Locale::from_token("EN"), Some(Locale::En));
        assert_eq!(Locale::from_token("deutsch"), Some(Locale::De));
        assert_eq!(Locale::from_token("fr"), None);
    }

    #[test]
    fn locale_cycle_wraps_around() {
        assert_eq!(Locale::En.next(), Locale::Es);
        assert_eq!(Locale::De.next(), Locale::En);
    }

    #[test]
    fn translations_differ_per_locale() {
        assert_eq!(tr(Locale::En, Msg::Services), "Services");
        assert_eq!(tr(Locale::Es, Msg::Services), "Servicios");
        assert_eq!(tr(Locale::De, Msg::Summary), "Übersicht");
    }
}
