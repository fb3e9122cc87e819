//! Resolution of pluggable override slots.
//!
//! Each override key binds to exactly one implementation per process,
//! chosen by host policy: either the built-in default or a named installed
//! plugin's declared implementation. Resolution failures fall back to an
//! implementation that satisfies the interface but performs no real
//! operation, so a misconfigured override can never crash the host.

use std::{
    collections::BTreeMap,
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
    sync::Mutex,
};

use tracing::warn;

use crate::{
    command::PluginDescriptor,
    error::{Error, Result},
    issues::{IssueSeverity, IssueTracker},
    loader::HandlerResolver,
};

/// How the host picks the credential-manager implementation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// Use the built-in default implementation.
    #[default]
    Default,
    /// Use the named installed plugin's declared implementation.
    Plugin(String),
}

/// The pluggable secret-storage interface.
///
/// Only the choice of implementation is managed here; the storage engines
/// themselves live behind this trait.
pub trait CredentialStore: Send + Sync {
    fn name(&self) -> &str;

    fn store(&self, account: &str, secret: &str) -> Result<()>;

    fn retrieve(&self, account: &str) -> Result<String>;

    fn delete(&self, account: &str) -> Result<()>;
}

/// The host's default in-memory credential store.
#[derive(Debug, Default)]
pub struct BuiltInCredentialStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl CredentialStore for BuiltInCredentialStore {
    fn name(&self) -> &str {
        "built-in"
    }

    fn store(&self, account: &str, secret: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::message("credential store lock poisoned"))?;
        entries.insert(account.to_string(), secret.to_string());
        Ok(())
    }

    fn retrieve(&self, account: &str) -> Result<String> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::message("credential store lock poisoned"))?;
        entries
            .get(account)
            .cloned()
            .ok_or_else(|| Error::message(format!("no credential stored for '{account}'")))
    }

    fn delete(&self, account: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::message("credential store lock poisoned"))?;
        entries.remove(account);
        Ok(())
    }
}

/// Fallback bound when override resolution fails. Construction never
/// panics; every operation fails with the reason resolution failed.
#[derive(Debug)]
pub struct InvalidCredentialStore {
    reason: String,
}

impl InvalidCredentialStore {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unusable(&self) -> Error {
        Error::message(format!(
            "The configured credential manager is unusable: {}",
            self.reason
        ))
    }
}

impl CredentialStore for InvalidCredentialStore {
    fn name(&self) -> &str {
        "invalid"
    }

    fn store(&self, _account: &str, _secret: &str) -> Result<()> {
        Err(self.unusable())
    }

    fn retrieve(&self, _account: &str) -> Result<String> {
        Err(self.unusable())
    }

    fn delete(&self, _account: &str) -> Result<()> {
        Err(self.unusable())
    }
}

/// Credential store backed by a plugin-provided program. Each operation
/// invokes the program with the operation name and account; `store` passes
/// the secret on stdin.
#[derive(Debug)]
pub struct ScriptCredentialStore {
    plugin_name: String,
    program: PathBuf,
}

impl ScriptCredentialStore {
    #[must_use]
    pub fn new(plugin_name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            program: program.into(),
        }
    }

    fn run(&self, operation: &str, account: &str, input: Option<&str>) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .arg(operation)
            .arg(account)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|error| {
            Error::message(format!(
                "failed to start credential program '{}': {error}",
                self.program.display()
            ))
        })?;
        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::message(format!(
                "credential program '{}' failed with {} for operation '{operation}'",
                self.program.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

impl CredentialStore for ScriptCredentialStore {
    fn name(&self) -> &str {
        &self.plugin_name
    }

    fn store(&self, account: &str, secret: &str) -> Result<()> {
        self.run("store", account, Some(secret)).map(|_| ())
    }

    fn retrieve(&self, account: &str) -> Result<String> {
        self.run("retrieve", account, None)
    }

    fn delete(&self, account: &str) -> Result<()> {
        self.run("delete", account, None).map(|_| ())
    }
}

/// Loads a plugin's declared override implementation from its reference.
///
/// Isolates the pipeline from any particular resolution mechanism; tests
/// substitute their own loader.
pub trait OverrideLoader {
    fn load(&self, plugin_name: &str, reference: &str) -> Result<Box<dyn CredentialStore>>;
}

/// Loader that resolves references through a [`HandlerResolver`] and wraps
/// the resolved program in a [`ScriptCredentialStore`].
pub struct ProgramOverrideLoader<'a> {
    pub resolver: &'a dyn HandlerResolver,
}

impl OverrideLoader for ProgramOverrideLoader<'_> {
    fn load(&self, plugin_name: &str, reference: &str) -> Result<Box<dyn CredentialStore>> {
        let program = self.resolver.resolve(plugin_name, reference)?;
        Ok(Box::new(ScriptCredentialStore::new(plugin_name, program)))
    }
}

/// Resolve the credential-manager binding from policy and the installed
/// set. Called at most once per manager; the returned binding is immutable
/// for the process lifetime.
///
/// Failures record an override error for the affected plugin and bind the
/// invalid fallback; other plugin functionality is unaffected.
pub fn resolve_credential_manager(
    issues: &mut IssueTracker,
    policy: &OverridePolicy,
    descriptors: &BTreeMap<String, PluginDescriptor>,
    loader: &dyn OverrideLoader,
) -> Box<dyn CredentialStore> {
    let plugin_name = match policy {
        OverridePolicy::Default => return Box::new(BuiltInCredentialStore::default()),
        OverridePolicy::Plugin(name) => name,
    };

    let Some(descriptor) = descriptors.get(plugin_name) else {
        let reason = format!(
            "Your configured credential manager is the plugin '{plugin_name}', \
             which is not an installed plugin."
        );
        issues.record(plugin_name, IssueSeverity::OverError, reason.clone());
        warn!(plugin = plugin_name.as_str(), "credential manager override fell back");
        return Box::new(InvalidCredentialStore::new(reason));
    };

    let reference = descriptor
        .config
        .overrides
        .as_ref()
        .and_then(|refs| refs.credential_manager.as_deref());
    let Some(reference) = reference else {
        let reason = format!(
            "The plugin '{plugin_name}' is configured to override the credential \
             manager, but it declares no credential manager implementation."
        );
        issues.record(plugin_name, IssueSeverity::OverError, reason.clone());
        return Box::new(InvalidCredentialStore::new(reason));
    };

    match loader.load(plugin_name, reference) {
        Ok(store) => store,
        Err(error) => {
            let reason = format!(
                "Unable to load the following module for plug-in '{plugin_name}': \
                 '{reference}'. Reason = {error}"
            );
            issues.record(plugin_name, IssueSeverity::OverError, reason.clone());
            warn!(plugin = plugin_name.as_str(), %error, "credential manager override fell back");
            Box::new(InvalidCredentialStore::new(reason))
        },
    }
}
