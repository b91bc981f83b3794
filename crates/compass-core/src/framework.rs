//! # Framework Model
//!
//! The immutable, read-only representation of a compliance framework: an
//! ordered set of categories (possibly nested) and, under each category, an
//! ordered set of controls.
//!
//! ## Structure
//!
//! A [`Framework`] is built from a [`FrameworkDefinition`] — the
//! serde-friendly, human-authored shape in which frameworks are registered
//! and stored. The constructor validates the definition (duplicate codes,
//! unknown parents, cycles) and then freezes it into an arena:
//!
//! - Categories live in a flat, sort-ordered `Vec` addressed by index.
//! - The parent/child hierarchy is a derived index (`CategoryId` → child
//!   ids), not traversable object pointers, so there is no cyclic-reference
//!   problem and no `Rc` in sight.
//! - Every control is indexed by id to its owning category for O(1)
//!   effective-coverage computation — no repeated linear scans during
//!   scoring.
//!
//! A category's own control list contains only the controls directly in it;
//! controls of descendant categories are never implicitly included. Subtree
//! rollups, where needed, must walk the child index explicitly.
//!
//! ## Identifier Stability
//!
//! Category and control ids are derived (UUIDv5) from the framework id and
//! the element's code. Rebuilding the model from the same stored definition
//! therefore yields the same ids, so mapping records that reference controls
//! by id stay valid across process restarts and re-loads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::FrameworkError;
use crate::identity::{CategoryId, ControlId, FrameworkId};

// ─── Definition (wire/storage shape) ─────────────────────────────────

/// A control as authored in a framework definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlDefinition {
    /// Short reference code, unique within the framework (e.g. "CC6.1").
    pub code: String,
    /// One-line requirement title.
    pub title: String,
    /// Longer requirement text.
    #[serde(default)]
    pub description: String,
    /// Position of the control within its category.
    pub sort_order: i32,
    /// Kind of policy that would typically satisfy this control.
    /// Absent means the owning category's name is used instead.
    #[serde(default)]
    pub suggested_policy_type: Option<String>,
}

/// A category as authored in a framework definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryDefinition {
    /// Short reference code, unique within the framework (e.g. "CC6").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Position of the category within the framework.
    pub sort_order: i32,
    /// Code of the parent category, for nested taxonomies.
    #[serde(default)]
    pub parent_code: Option<String>,
    /// Framework-supplied flag: gaps in this category escalate from high
    /// to critical severity.
    #[serde(default)]
    pub high_priority: bool,
    /// Controls directly in this category.
    #[serde(default)]
    pub controls: Vec<ControlDefinition>,
}

/// The registration/storage shape of a framework.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameworkDefinition {
    /// Short reference code (e.g. "SOC2", "ISO27001").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Version label of the standard (e.g. "2022").
    pub version: String,
    /// Categories in authoring order. They are re-sorted by `sort_order`
    /// at load time.
    pub categories: Vec<CategoryDefinition>,
}

// ─── Frozen model ────────────────────────────────────────────────────

/// A control inside a loaded framework.
#[derive(Debug, Clone)]
pub struct Control {
    /// Stable identifier, assigned at load.
    pub id: ControlId,
    /// Reference code from the definition.
    pub code: String,
    /// Requirement title.
    pub title: String,
    /// Requirement text.
    pub description: String,
    /// Position within the owning category.
    pub sort_order: i32,
    /// Authored policy-type hint, if any.
    pub suggested_policy_type: Option<String>,
    /// The category this control belongs to. Exactly one.
    pub category: CategoryId,
}

/// A category inside a loaded framework.
#[derive(Debug, Clone)]
pub struct Category {
    /// Stable identifier, assigned at load.
    pub id: CategoryId,
    /// Reference code from the definition.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Position within the framework.
    pub sort_order: i32,
    /// Parent category, if nested. Guaranteed acyclic.
    pub parent: Option<CategoryId>,
    /// Severity-escalation flag from the definition.
    pub high_priority: bool,
    /// Controls directly in this category, sorted by `sort_order`.
    pub controls: Vec<Control>,
}

/// Location of a control inside the framework arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRef {
    /// Index of the owning category in the arena.
    pub category_index: usize,
    /// Index of the control within the category's control list.
    pub control_index: usize,
}

/// An immutable, validated framework.
///
/// Construction is only possible through [`Framework::from_definition`],
/// which enforces the structural invariants. Every accessor is read-only.
#[derive(Debug, Clone)]
pub struct Framework {
    id: FrameworkId,
    code: String,
    name: String,
    version: String,
    /// Arena of categories, sorted by (`sort_order`, `code`).
    categories: Vec<Category>,
    /// Derived index: category id → ordered child category ids.
    children: HashMap<CategoryId, Vec<CategoryId>>,
    /// Derived index: control id → location in the arena.
    control_index: HashMap<ControlId, ControlRef>,
    /// Derived index: category id → arena position.
    category_index: HashMap<CategoryId, usize>,
}

impl Framework {
    /// Validate a definition and freeze it into a framework model.
    ///
    /// # Errors
    ///
    /// - [`FrameworkError::EmptyField`] if code, name, or version is blank.
    /// - [`FrameworkError::DuplicateCategory`] / [`FrameworkError::DuplicateControl`]
    ///   on repeated codes.
    /// - [`FrameworkError::UnknownParent`] if a `parent_code` names no category.
    /// - [`FrameworkError::CategoryCycle`] if the parent chain loops.
    ///
    /// A framework with zero controls loads successfully; scoring such a
    /// framework is rejected later by the analysis engine, not here.
    pub fn from_definition(
        id: FrameworkId,
        definition: &FrameworkDefinition,
    ) -> Result<Self, FrameworkError> {
        for (field, value) in [
            ("code", &definition.code),
            ("name", &definition.name),
            ("version", &definition.version),
        ] {
            if value.trim().is_empty() {
                return Err(FrameworkError::EmptyField { field });
            }
        }

        // Category codes must be unique; they are the parent-reference
        // namespace.
        let mut code_to_position: HashMap<&str, usize> = HashMap::new();
        for (position, category) in definition.categories.iter().enumerate() {
            if code_to_position
                .insert(category.code.as_str(), position)
                .is_some()
            {
                return Err(FrameworkError::DuplicateCategory {
                    code: category.code.clone(),
                });
            }
        }

        // Parent references must resolve and must not loop. A chain longer
        // than the category count has necessarily revisited a node.
        for category in &definition.categories {
            let mut current = category;
            let mut steps = 0usize;
            while let Some(parent_code) = &current.parent_code {
                let parent_position = *code_to_position.get(parent_code.as_str()).ok_or_else(
                    || FrameworkError::UnknownParent {
                        code: category.code.clone(),
                        parent: parent_code.clone(),
                    },
                )?;
                steps += 1;
                if steps > definition.categories.len() {
                    return Err(FrameworkError::CategoryCycle {
                        code: category.code.clone(),
                    });
                }
                current = &definition.categories[parent_position];
            }
        }

        // Control codes are unique framework-wide so gap lists and CSV
        // exports can reference them without qualification.
        let mut seen_controls: HashMap<&str, ()> = HashMap::new();
        for category in &definition.categories {
            for control in &category.controls {
                if seen_controls.insert(control.code.as_str(), ()).is_some() {
                    return Err(FrameworkError::DuplicateControl {
                        code: control.code.clone(),
                    });
                }
            }
        }

        // Assign deterministic ids, then sort into canonical order. Codes
        // are unique (checked above), so the derived UUIDs are too.
        let mut id_by_code: HashMap<&str, CategoryId> = HashMap::new();
        for category in &definition.categories {
            id_by_code.insert(
                category.code.as_str(),
                derived_category_id(&id, &category.code),
            );
        }

        let mut categories: Vec<Category> = definition
            .categories
            .iter()
            .map(|category| {
                let category_id = id_by_code[category.code.as_str()];
                let mut controls: Vec<Control> = category
                    .controls
                    .iter()
                    .map(|control| Control {
                        id: derived_control_id(&id, &control.code),
                        code: control.code.clone(),
                        title: control.title.clone(),
                        description: control.description.clone(),
                        sort_order: control.sort_order,
                        suggested_policy_type: control.suggested_policy_type.clone(),
                        category: category_id,
                    })
                    .collect();
                controls.sort_by(|a, b| {
                    a.sort_order
                        .cmp(&b.sort_order)
                        .then_with(|| a.code.cmp(&b.code))
                });
                Category {
                    id: category_id,
                    code: category.code.clone(),
                    name: category.name.clone(),
                    sort_order: category.sort_order,
                    parent: category
                        .parent_code
                        .as_deref()
                        .map(|code| id_by_code[code]),
                    high_priority: category.high_priority,
                    controls,
                }
            })
            .collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.code.cmp(&b.code))
        });

        // Derived indexes.
        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        let mut control_index = HashMap::new();
        let mut category_index = HashMap::new();
        for (category_position, category) in categories.iter().enumerate() {
            category_index.insert(category.id, category_position);
            if let Some(parent) = category.parent {
                children.entry(parent).or_default().push(category.id);
            }
            for (control_position, control) in category.controls.iter().enumerate() {
                control_index.insert(
                    control.id,
                    ControlRef {
                        category_index: category_position,
                        control_index: control_position,
                    },
                );
            }
        }

        Ok(Self {
            id,
            code: definition.code.clone(),
            name: definition.name.clone(),
            version: definition.version.clone(),
            categories,
            children,
            control_index,
            category_index,
        })
    }

    /// The framework's identifier.
    pub fn id(&self) -> FrameworkId {
        self.id
    }

    /// The framework's reference code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The framework's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The framework's version label.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Categories in canonical (sort-order) sequence.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Total number of controls across all categories.
    pub fn control_count(&self) -> usize {
        self.categories.iter().map(|c| c.controls.len()).sum()
    }

    /// All controls in canonical order: category order, then control order.
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.categories.iter().flat_map(|c| c.controls.iter())
    }

    /// Look up a control by id.
    pub fn control(&self, id: ControlId) -> Option<&Control> {
        let at = self.control_index.get(&id)?;
        Some(&self.categories[at.category_index].controls[at.control_index])
    }

    /// Look up a category by id.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        let position = self.category_index.get(&id)?;
        Some(&self.categories[*position])
    }

    /// The category a control belongs to.
    pub fn category_of(&self, control: ControlId) -> Option<&Category> {
        let at = self.control_index.get(&control)?;
        Some(&self.categories[at.category_index])
    }

    /// Direct child categories of a category (empty for leaves).
    pub fn children_of(&self, id: CategoryId) -> &[CategoryId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Derive the stable id of a category from its framework and code.
fn derived_category_id(framework: &FrameworkId, code: &str) -> CategoryId {
    CategoryId(uuid::Uuid::new_v5(
        framework.as_uuid(),
        format!("category:{code}").as_bytes(),
    ))
}

/// Derive the stable id of a control from its framework and code.
fn derived_control_id(framework: &FrameworkId, code: &str) -> ControlId {
    ControlId(uuid::Uuid::new_v5(
        framework.as_uuid(),
        format!("control:{code}").as_bytes(),
    ))
}
