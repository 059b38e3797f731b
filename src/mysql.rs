//! MySQL command construction and execution.
//!
//! Dumps are taken in two passes, structure then content, appended to the
//! same file. Keeping rows out of the `CREATE TABLE` pass and writing one
//! `INSERT` per row keeps the content pass line-oriented, which is what the
//! URL migration in [`crate::migrate`] works on.

use tracing::info;

use crate::error::Result;
use crate::project::DatabaseCredentials;
use crate::terminal::Terminal;

/// Builds mysql and mysqldump command lines for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySql {
    username: String,
    password: String,
}

impl MySql {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// A client logged in as the project's own account.
    pub fn for_credentials(credentials: &DatabaseCredentials) -> Self {
        Self::new(&credentials.username, &credentials.password)
    }

    pub fn query(&self, sql: &str) -> String {
        format!("mysql -u{} -p{} -e \"{sql}\"", self.username, self.password)
    }

    pub fn import(&self, file: &str, database: &str) -> String {
        format!(
            "mysql -u{} -p{} {database} < {file}",
            self.username, self.password
        )
    }

    /// Schema only, written to `file`.
    pub fn dump_structure(&self, database: &str, file: &str) -> String {
        format!(
            "mysqldump -u{} -p{} --no-data --skip-comments {database} > {file}",
            self.username, self.password
        )
    }

    /// Rows only, one `INSERT` per row, appended to `file`.
    pub fn dump_content(&self, database: &str, file: &str) -> String {
        format!(
            "mysqldump -u{} -p{} --no-create-info --skip-extended-insert --skip-comments {database} >> {file}",
            self.username, self.password
        )
    }

    /// Both dump passes, structure first.
    pub fn dump(&self, database: &str, file: &str) -> [String; 2] {
        [
            self.dump_structure(database, file),
            self.dump_content(database, file),
        ]
    }
}

pub fn show_database(database: &str) -> String {
    format!("SHOW DATABASES LIKE '{database}'")
}

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE {database}")
}

pub fn create_user(credentials: &DatabaseCredentials) -> String {
    format!(
        "CREATE USER IF NOT EXISTS '{}'@'{}' IDENTIFIED BY '{}'",
        credentials.username, credentials.hostname, credentials.password
    )
}

pub fn grant_all(credentials: &DatabaseCredentials) -> String {
    format!(
        "GRANT ALL ON {}.* TO '{}'@'{}'",
        credentials.database, credentials.username, credentials.hostname
    )
}

pub fn drop_database(database: &str) -> String {
    format!("DROP DATABASE {database}")
}

pub fn drop_user(credentials: &DatabaseCredentials) -> String {
    format!(
        "DROP USER '{}'@'{}'",
        credentials.username, credentials.hostname
    )
}

/// Runs database operations through a terminal.
pub struct Database<'t, 'r> {
    terminal: &'t Terminal<'r>,
    client: MySql,
}

impl<'t, 'r> Database<'t, 'r> {
    pub fn new(terminal: &'t Terminal<'r>, client: MySql) -> Self {
        Self { terminal, client }
    }

    pub fn query(&self, sql: &str) -> Result<String> {
        self.terminal.run(&self.client.query(sql))
    }

    /// Whether `database` exists. A failing lookup counts as absent.
    pub fn exists(&self, database: &str) -> Result<bool> {
        let attempt = self
            .terminal
            .ignore_error()
            .run(&self.client.query(&show_database(database)))?;
        Ok(attempt.success && attempt.output.lines().any(|line| line.trim() == database))
    }

    /// Creates the project database and an account with all privileges on it.
    pub fn create(&self, credentials: &DatabaseCredentials) -> Result<()> {
        info!("creating database {}", credentials.database);
        self.query(&create_database(&credentials.database))?;
        self.query(&create_user(credentials))?;
        self.query(&grant_all(credentials))?;
        Ok(())
    }

    /// Drops the project database and its account. Either may already be
    /// gone, so failures are tolerated.
    pub fn drop(&self, credentials: &DatabaseCredentials) -> Result<()> {
        info!("dropping database {}", credentials.database);
        self.terminal
            .ignore_error()
            .run(&self.client.query(&drop_database(&credentials.database)))?;
        self.terminal
            .ignore_error()
            .run(&self.client.query(&drop_user(credentials)))?;
        Ok(())
    }

    /// Dumps `database` into `file` on the terminal's host.
    pub fn dump(&self, database: &str, file: &str) -> Result<()> {
        let [structure, content] = self.client.dump(database, file);
        self.terminal
            .start_session()
            .add(structure)
            .add(content)
            .execute()?;
        Ok(())
    }

    pub fn import(&self, file: &str, database: &str) -> Result<()> {
        self.terminal.run(&self.client.import(file, database))?;
        Ok(())
    }
}
