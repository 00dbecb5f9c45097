//! Connector catalog: grouping, union collapsing and startup defaults.
//!
//! The backend returns a flat connector list. The catalog groups it by
//! classification in a fixed order and collapses every union group into a
//! single slot whose effective member can be switched without moving the
//! slot. All functions here are pure.

use std::collections::{HashMap, HashSet};

use studio_types::connector::{
    Connector, ConnectorClassification, ConnectorId, LastPublishInfo, UnionInfo, UnionSelections,
};

// ---------------------------------------------------------------------------
// Catalog entries
// ---------------------------------------------------------------------------

/// A union group collapsed into one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionEntry {
    pub union_id: String,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    /// The member currently standing in for the union.
    pub member: Connector,
    /// Every member present in the list, declared options first.
    pub options: Vec<Connector>,
}

/// One slot in a catalog group.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Single(Connector),
    Union(UnionEntry),
}

impl CatalogEntry {
    /// The connector that is selected/published when this slot is chosen.
    pub fn connector(&self) -> &Connector {
        match self {
            CatalogEntry::Single(c) => c,
            CatalogEntry::Union(u) => &u.member,
        }
    }

    pub fn union_id(&self) -> Option<&str> {
        match self {
            CatalogEntry::Single(_) => None,
            CatalogEntry::Union(u) => Some(&u.union_id),
        }
    }
}

/// Entries of one classification, in raw list order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorGroup {
    pub classification: ConnectorClassification,
    pub entries: Vec<CatalogEntry>,
}

// ---------------------------------------------------------------------------
// Union resolution
// ---------------------------------------------------------------------------

/// Union id of a connector, if it belongs to a union the backend described.
///
/// A `union_id` without matching `UnionInfo` is treated as a plain connector.
pub fn union_of<'a>(connector: &'a Connector, unions: &HashMap<String, UnionInfo>) -> Option<&'a str> {
    connector
        .union_id
        .as_deref()
        .filter(|id| unions.contains_key(*id))
}

/// Members of `union_id` present in the list, in raw order.
pub fn union_members<'a>(connectors: &'a [Connector], union_id: &str) -> Vec<&'a Connector> {
    connectors
        .iter()
        .filter(|c| c.union_id.as_deref() == Some(union_id))
        .collect()
}

/// Effective member of one union.
///
/// Resolution order: the explicit selection when it names a present member,
/// the first declared option present in the list, the first member that was
/// part of the last publish, the first member in raw order.
pub fn resolve_union_member<'a>(
    union_id: &str,
    connectors: &'a [Connector],
    unions: &HashMap<String, UnionInfo>,
    selections: &UnionSelections,
    last_publish: &LastPublishInfo,
) -> Option<&'a Connector> {
    let members = union_members(connectors, union_id);
    if members.is_empty() {
        return None;
    }
    let find = |id: &ConnectorId| members.iter().copied().find(|c| &c.id == id);

    if let Some(found) = selections.get(union_id).and_then(find) {
        return Some(found);
    }
    if let Some(info) = unions.get(union_id) {
        if let Some(found) = info
            .connector_options
            .iter()
            .find_map(|option| find(&option.connector_id))
        {
            return Some(found);
        }
    }
    if let Some(found) = last_publish.connector_ids.iter().find_map(find) {
        return Some(found);
    }
    members.first().copied()
}

/// Union selections to start from when nothing was restored.
///
/// A returning user sees the member they last published; otherwise the
/// normal resolution applies.
pub fn default_union_selections(
    connectors: &[Connector],
    unions: &HashMap<String, UnionInfo>,
    last_publish: &LastPublishInfo,
) -> UnionSelections {
    let mut selections = UnionSelections::new();
    for union_id in unions.keys() {
        let members = union_members(connectors, union_id);
        let published = last_publish
            .connector_ids
            .iter()
            .find_map(|id| members.iter().find(|c| &c.id == id));
        let member = match published {
            Some(c) => Some(*c),
            None => resolve_union_member(
                union_id,
                connectors,
                unions,
                &UnionSelections::new(),
                last_publish,
            ),
        };
        if let Some(member) = member {
            selections.insert(union_id.clone(), member.id.clone());
        }
    }
    selections
}

/// Connector ids to preselect: the last publish mapped onto current members.
///
/// Ids that no longer exist are dropped; a union member stands for its
/// union's effective member. Order follows the last publish, deduplicated.
pub fn default_selected_ids(
    connectors: &[Connector],
    unions: &HashMap<String, UnionInfo>,
    selections: &UnionSelections,
    last_publish: &LastPublishInfo,
) -> Vec<ConnectorId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for id in &last_publish.connector_ids {
        let Some(connector) = connectors.iter().find(|c| &c.id == id) else {
            continue;
        };
        let effective = match union_of(connector, unions) {
            Some(union_id) => {
                resolve_union_member(union_id, connectors, unions, selections, last_publish)
                    .map(|c| c.id.clone())
            }
            None => Some(connector.id.clone()),
        };
        if let Some(effective) = effective {
            if seen.insert(effective.clone()) {
                ids.push(effective);
            }
        }
    }
    ids
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

fn union_entry(
    union_id: &str,
    connectors: &[Connector],
    unions: &HashMap<String, UnionInfo>,
    selections: &UnionSelections,
    last_publish: &LastPublishInfo,
) -> Option<UnionEntry> {
    let info = unions.get(union_id)?;
    let member =
        resolve_union_member(union_id, connectors, unions, selections, last_publish)?.clone();

    let members = union_members(connectors, union_id);
    let mut options: Vec<Connector> = info
        .connector_options
        .iter()
        .filter_map(|o| members.iter().find(|c| c.id == o.connector_id))
        .map(|c| (*c).clone())
        .collect();
    for c in members {
        if !options.iter().any(|o| o.id == c.id) {
            options.push(c.clone());
        }
    }

    Some(UnionEntry {
        union_id: union_id.to_string(),
        name: info.name.clone(),
        description: info.description.clone(),
        icon_url: info.icon_url.clone(),
        member,
        options,
    })
}

/// Group the raw list for display.
///
/// Groups come in `ConnectorClassification::ORDER`; empty groups are
/// omitted. A union occupies the position (and classification) of its first
/// member in the raw list.
pub fn build_groups(
    connectors: &[Connector],
    unions: &HashMap<String, UnionInfo>,
    selections: &UnionSelections,
    last_publish: &LastPublishInfo,
) -> Vec<ConnectorGroup> {
    let mut by_class: HashMap<ConnectorClassification, Vec<CatalogEntry>> = HashMap::new();
    let mut placed_unions = HashSet::new();

    for connector in connectors {
        let entry = match union_of(connector, unions) {
            Some(union_id) => {
                if !placed_unions.insert(union_id.to_string()) {
                    continue;
                }
                match union_entry(union_id, connectors, unions, selections, last_publish) {
                    Some(entry) => CatalogEntry::Union(entry),
                    None => continue,
                }
            }
            None => CatalogEntry::Single(connector.clone()),
        };
        by_class
            .entry(connector.classification)
            .or_default()
            .push(entry);
    }

    ConnectorClassification::ORDER
        .iter()
        .filter_map(|class| {
            by_class.remove(class).map(|entries| ConnectorGroup {
                classification: *class,
                entries,
            })
        })
        .collect()
}
