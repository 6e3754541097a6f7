use clap::Parser;
use sql_middleware::middleware::DatabaseType;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Database type: sqlite or postgres
    #[arg(
        short = 'd',
        long,
        value_name = "DATABASE_TYPE",
        default_value = "Sqlite",
        value_parser = clap::value_parser!(DatabaseType)
    )]
    pub db_type: DatabaseType,
    // Only necessary for postgres.
    #[arg(long, value_name = "DATABASE_HOST", default_value = "localhost")]
    pub db_host: Option<String>,
    #[arg(
        short = 'p',
        long,
        value_name = "DATABASE_PORT",
        default_value = "5432"
    )]
    pub db_port: Option<u16>,
    #[arg(
        short = 'u',
        long,
        value_name = "DATABASE_USER",
        default_value = "postgres"
    )]
    pub db_user: Option<String>,
    #[arg(short = 'w', long, value_name = "DATABASE_PASSWORD")]
    pub db_password: Option<String>,

    /// For postgres, the name of the database. For sqlite, the filename.
    #[arg(short = 'n', long, value_name = "DATABASE_NAME")]
    pub db_name: String,
    /// Extra sql to run on startup, after the schema DDL. Semicolon-separated
    /// list of files.
    #[arg(long, value_name = "DATABASE_STARTUP_SCRIPT", value_parser = crate::args::validation::check_readable_file)]
    pub db_startup_script: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CleanArgs {
    pub db_type: DatabaseType,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_name: String,
    pub db_startup_script: Option<String>,
    pub combined_sql_script: String,
}

impl Args {
    /// # Errors
    ///
    /// Will return `Err` if a startup script file cannot be read
    pub fn clean(self) -> Result<CleanArgs, String> {
        let combined_sql_script = match &self.db_startup_script {
            Some(scripts) => {
                let mut combined = String::new();
                for file in scripts.split(';') {
                    let contents = std::fs::read_to_string(file)
                        .map_err(|e| format!("failed to read startup script '{file}': {e}"))?;
                    combined.push_str(&contents);
                    combined.push('\n');
                }
                combined
            }
            None => String::new(),
        };
        Ok(CleanArgs {
            db_type: self.db_type,
            db_host: self.db_host,
            db_port: self.db_port,
            db_user: self.db_user,
            db_password: self.db_password,
            db_name: self.db_name,
            db_startup_script: self.db_startup_script,
            combined_sql_script,
        })
    }
}
