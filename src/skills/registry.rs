//! Skill discovery and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Skill, SkillError};

/// In-memory registry of available skills.
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in skills.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Built-in names are distinct; registration cannot fail here.
        let _ = registry.register(Arc::new(super::EchoSkill));
        let _ = registry.register(Arc::new(super::NormalizeHandleSkill));
        let _ = registry.register(Arc::new(super::McpToolSkill));
        registry
    }

    /// Register a skill under its own name.
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<(), SkillError> {
        let name = skill.name().to_string();
        if self.skills.contains_key(&name) {
            return Err(SkillError::AlreadyRegistered(name));
        }
        self.skills.insert(name, skill);
        Ok(())
    }

    /// Fetch a skill by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Skill>, SkillError> {
        self.skills
            .get(name)
            .cloned()
            .ok_or_else(|| SkillError::NotRegistered(name.to_string()))
    }

    /// Sorted list of registered skill names.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.skills.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = SkillRegistry::with_builtins();
        assert_eq!(
            registry.list_names(),
            vec!["echo", "mcp_tool", "normalize_handle"]
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = SkillRegistry::with_builtins();
        let outcome = registry.register(Arc::new(super::super::EchoSkill));
        assert!(matches!(
            outcome,
            Err(SkillError::AlreadyRegistered(name)) if name == "echo"
        ));
    }

    #[test]
    fn test_unknown_skill_lookup_fails() {
        let registry = SkillRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(SkillError::NotRegistered(name)) if name == "missing"
        ));
    }
}
