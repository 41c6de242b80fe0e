use std::io;
use std::path::Path;

/// SQL text used by the Postgres store, built once at startup and shared.
///
/// Every statement has an embedded default from `sql/`. [`Queries::load`]
/// lets a deployment override individual statements from a directory
/// holding files with the same names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queries {
    pub copy_races: String,
    pub insert_race: String,
    pub insert_language: String,
    pub link_by_name: String,
    pub link_by_id: String,
    pub read_races: String,
    pub read_race: String,
    pub read_languages: String,
    pub truncate_races: String,
}

impl Default for Queries {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Queries {
    pub fn embedded() -> Self {
        Self {
            copy_races: include_str!("../../sql/copy_races.sql").to_string(),
            insert_race: include_str!("../../sql/insert_race.sql").to_string(),
            insert_language: include_str!("../../sql/insert_language.sql").to_string(),
            link_by_name: include_str!("../../sql/link_by_name.sql").to_string(),
            link_by_id: include_str!("../../sql/link_by_id.sql").to_string(),
            read_races: include_str!("../../sql/read_races.sql").to_string(),
            read_race: include_str!("../../sql/read_race.sql").to_string(),
            read_languages: include_str!("../../sql/read_languages.sql").to_string(),
            truncate_races: include_str!("../../sql/truncate_races.sql").to_string(),
        }
    }

    /// Start from the embedded statements and replace each one for which
    /// `<dir>/<name>.sql` exists.
    pub async fn load(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        let mut queries = Self::embedded();

        for (name, text) in queries.entries_mut() {
            let path = dir.join(format!("{}.sql", name));
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    tracing::info!("Loaded query '{}' from {}", name, path.display());
                    *text = contents;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(queries)
    }

    fn entries_mut(&mut self) -> [(&'static str, &mut String); 9] {
        [
            ("copy_races", &mut self.copy_races),
            ("insert_race", &mut self.insert_race),
            ("insert_language", &mut self.insert_language),
            ("link_by_name", &mut self.link_by_name),
            ("link_by_id", &mut self.link_by_id),
            ("read_races", &mut self.read_races),
            ("read_race", &mut self.read_race),
            ("read_languages", &mut self.read_languages),
            ("truncate_races", &mut self.truncate_races),
        ]
    }
}
