//! Creates a database on the cluster.

use crate::command::{
    encode_uri_component, HttpMethod, ProtocolCommand, RequestDescription, ServerNode,
};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Setting that must be present when creating a database.
pub const DATA_DIR_SETTING: &str = "DataDir";

/// The record describing a database to create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseDocument {
    /// Name of the database.
    pub database_name: String,
    /// Server settings for the database. Must contain [`DATA_DIR_SETTING`].
    pub settings: Map<String, Value>,
}

impl DatabaseDocument {
    /// Creates a record with the mandatory data directory setting.
    pub fn new(database_name: impl Into<String>, data_dir: impl Into<String>) -> Self {
        let mut settings = Map::new();
        settings.insert(DATA_DIR_SETTING.to_string(), Value::String(data_dir.into()));
        Self {
            database_name: database_name.into(),
            settings,
        }
    }
}

/// Creates a database from its record.
#[derive(Debug)]
pub struct CreateDatabaseCommand {
    document: DatabaseDocument,
    result: Option<Value>,
}

impl CreateDatabaseCommand {
    /// Creates the command.
    ///
    /// The database name must be non-empty and restricted to letters,
    /// digits, `_`, `-` and `.`; the record must carry the data
    /// directory setting. All of it is checked here, before any request
    /// is built.
    pub fn new(document: DatabaseDocument) -> ProtocolResult<Self> {
        let name = &document.database_name;
        if name.is_empty() {
            return Err(ProtocolError::invalid_argument(
                "database_name",
                "must not be empty",
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(ProtocolError::invalid_argument(
                "database_name",
                format!("`{name}` contains characters not allowed in a database name"),
            ));
        }
        if !document.settings.contains_key(DATA_DIR_SETTING) {
            return Err(ProtocolError::InvalidOperation(format!(
                "the {DATA_DIR_SETTING} setting is mandatory"
            )));
        }

        Ok(Self {
            document,
            result: None,
        })
    }
}

impl ProtocolCommand for CreateDatabaseCommand {
    type Result = Value;

    fn build_request(&self, node: &ServerNode) -> ProtocolResult<RequestDescription> {
        let uri = format!(
            "{}/admin/databases?name={}",
            node.url,
            encode_uri_component(&self.document.database_name)
        );
        let body = serde_json::to_string(&self.document)?;

        Ok(RequestDescription::new(HttpMethod::Put, uri).with_json_body(body))
    }

    fn parse_response(&mut self, body: Option<&str>, _from_cache: bool) -> ProtocolResult<()> {
        let body = body.ok_or_else(|| {
            ProtocolError::InvalidResponse("create database response is missing a body".to_string())
        })?;
        self.result = Some(serde_json::from_str(body)?);
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }
}
