//! Task routing
//!
//! Keyword classification of a task description: either it goes to a
//! specialist, or it is handled generically by the executor. Specialists
//! are tried in config order; the first one with a keyword contained in the
//! lowercased description wins.

use crate::config::SpecialistConfig;

/// Where a task should be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Generic,
    Delegate(String),
}

#[derive(Debug, Clone, Default)]
pub struct TaskRouter {
    routes: Vec<(String, Vec<String>)>,
}

impl TaskRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(specialists: &[SpecialistConfig]) -> Self {
        let mut router = Self::new();
        for specialist in specialists {
            router.add_route(&specialist.id, &specialist.keywords);
        }
        router
    }

    /// Route tasks matching any of `keywords` to `specialist`
    pub fn add_route(&mut self, specialist: &str, keywords: &[String]) {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        if !keywords.is_empty() {
            self.routes.push((specialist.to_string(), keywords));
        }
    }

    pub fn classify(&self, description: &str) -> Route {
        let lowered = description.to_lowercase();

        self.routes
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map(|(id, _)| Route::Delegate(id.clone()))
            .unwrap_or(Route::Generic)
    }
}
