//! Executes the action attached to a notification.
//!
//! Three kinds are supported: navigation through the host's [`Navigator`],
//! an application-wide modal-open event, and invocation of a function the
//! host registered by name.

use crate::types::notification::{ActionKind, NotificationAction};
use crate::types::{NotificationError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use url::Url;

// Only used to parse relative targets
const RELATIVE_BASE: &str = "http://relative.invalid";

/// Path, query and fragment extracted from a navigation target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationTarget {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub fragment: Option<String>,
}

impl NavigationTarget {
    /// `path?query#fragment`
    pub fn to_location(&self) -> String {
        let mut location = self.path.clone();
        if !self.query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            location.push('?');
            location.push_str(&query);
        }
        if let Some(fragment) = &self.fragment {
            location.push('#');
            location.push_str(fragment);
        }
        location
    }
}

/// In-app router of the host application
pub trait Navigator: Send + Sync {
    /// Client-side navigation; an error triggers the hard fallback
    fn navigate(&self, target: &NavigationTarget) -> Result<()>;

    /// Full page load
    fn hard_navigate(&self, location: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    OpenModal { component: String, params: Value },
}

pub type ActionFn = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Splits a relative path or absolute URL into a [`NavigationTarget`] and
/// merges `params` into its query; declared params override existing keys.
pub fn resolve_navigation(target: &str, params: &Value) -> Result<NavigationTarget> {
    let base = Url::parse(RELATIVE_BASE)?;
    let url = base.join(target)?;

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if let Value::Object(map) = params {
        for (key, value) in map {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            query.retain(|(existing, _)| existing != key);
            query.push((key.clone(), value));
        }
    }

    Ok(NavigationTarget {
        path: url.path().to_string(),
        query,
        fragment: url.fragment().map(str::to_string),
    })
}

pub struct ActionDispatcher {
    navigator: Option<Arc<dyn Navigator>>,
    events: broadcast::Sender<AppEvent>,
    functions: RwLock<HashMap<String, ActionFn>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self {
            navigator: None,
            events,
            functions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    pub fn register<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(function));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn execute(&self, action: &NotificationAction) -> Result<()> {
        match action.kind {
            ActionKind::Navigate => self.navigate(&action.target, &action.params),
            ActionKind::Modal => {
                let event = AppEvent::OpenModal {
                    component: action.target.clone(),
                    params: action.params.clone(),
                };
                if self.events.send(event).is_err() {
                    tracing::debug!("No modal listener for {}", action.target);
                }
                Ok(())
            }
            ActionKind::Function => {
                let function = self
                    .functions
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&action.target)
                    .cloned();
                let Some(function) = function else {
                    tracing::warn!("Function {} is not registered", action.target);
                    return Err(NotificationError::Action(format!(
                        "unknown function: {}",
                        action.target
                    )));
                };
                if let Err(e) = function(&action.params) {
                    tracing::warn!("Action function {} failed: {}", action.target, e);
                }
                Ok(())
            }
        }
    }

    fn navigate(&self, target: &str, params: &Value) -> Result<()> {
        let navigator = self
            .navigator
            .as_ref()
            .ok_or_else(|| NotificationError::Action("no navigator registered".to_string()))?;
        let target = resolve_navigation(target, params)?;

        if let Err(e) = navigator.navigate(&target) {
            tracing::warn!("In-app navigation failed ({}), falling back to full load", e);
            navigator.hard_navigate(&target.to_location());
        }
        Ok(())
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
