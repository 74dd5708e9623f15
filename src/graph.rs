//! Reference graph construction: flip per-unit symbol tables around.
//!
//! A symbol table describes what a unit calls OUT to. The report needs the
//! inverse — for each unit, who calls IN — so this module walks every
//! compiled table plus the template controller bindings and accumulates
//! inverted indexes into one `ReferenceObject` per referenced name.
//!
//! Citations are appended in visit order without deduplication: a unit that
//! references the same target in several `externalReferences` entries lands
//! one citation per entry occurrence. See DESIGN.md for the sign-off on
//! keeping that accumulate-and-append behavior.

use std::collections::{BTreeMap, BTreeSet};

use crate::symbols::SymbolTable;
use crate::types::{CodeUnit, ReferenceObject, UiTemplate};

/// Build and attach a reference object to every unit.
///
/// Units named by a template controller list or by another unit's external
/// references get a populated object; every other unit gets a canonical
/// empty object. The `is_referenced_externally` flag tracks code references
/// only — a unit used solely as a template controller keeps it unset.
/// Units without a symbol table contribute no outgoing references and no
/// member-level template hits, but still collect their `visualforce`
/// bindings and remain valid targets.
pub fn build_reference_graph(units: &mut [CodeUnit], templates: &[UiTemplate]) {
    let by_controller = index_templates_by_controller(templates);
    let mut code_targets: BTreeSet<String> = BTreeSet::new();
    let mut graph: BTreeMap<String, ReferenceObject> = BTreeMap::new();

    for unit in units.iter() {
        if let Some(bound) = by_controller.get(unit.name.as_str()) {
            let object = graph.entry(unit.name.clone()).or_default();
            record_template_bindings(object, unit.symbol_table.as_ref(), bound);
        }

        let Some(table) = &unit.symbol_table else {
            continue;
        };
        record_external_references(&mut graph, &mut code_targets, &unit.name, table);
    }

    for unit in units.iter_mut() {
        unit.is_referenced_externally = code_targets.contains(&unit.name);
        unit.references = Some(graph.get(&unit.name).cloned().unwrap_or_default());
    }
}

/// Index controller name -> templates declaring it. A template appears once
/// per controller name it declares; a name maps to every template using it.
fn index_templates_by_controller(templates: &[UiTemplate]) -> BTreeMap<String, Vec<&UiTemplate>> {
    let mut index: BTreeMap<String, Vec<&UiTemplate>> = BTreeMap::new();
    for template in templates {
        for name in template.controller_names() {
            index.entry(name.to_string()).or_default().push(template);
        }
    }
    return index;
}

/// Fold one unit's external references into the graph, keyed by target.
/// Entries carrying a namespace are skipped — those targets live outside
/// the scanned org. Every surviving target is also recorded as a code
/// target, which is what drives `is_referenced_externally`.
fn record_external_references(
    graph: &mut BTreeMap<String, ReferenceObject>,
    code_targets: &mut BTreeSet<String>,
    source: &str,
    table: &SymbolTable,
) {
    for external in &table.external_references {
        if external.namespace.as_deref().is_some_and(|ns| return !ns.is_empty()) {
            continue;
        }

        code_targets.insert(external.name.clone());
        let object = graph.entry(external.name.clone()).or_default();

        for citation in &external.references {
            object
                .classes
                .entry(source.to_string())
                .or_default()
                .push(citation.display());
        }

        for method in &external.methods {
            let lines = object
                .methods
                .entry(method.name.clone())
                .or_default()
                .entry(source.to_string())
                .or_default();
            for citation in &method.references {
                lines.push(citation.display());
            }
        }

        for variable in &external.variables {
            let lines = object
                .variables
                .entry(variable.name.clone())
                .or_default()
                .entry(source.to_string())
                .or_default();
            for citation in &variable.references {
                lines.push(citation.display());
            }
        }
    }
}

/// Record a controller unit's template usages: every bound template lands
/// in `visualforce`, and each declared method or property whose merge-field
/// form (`{!name}`) appears in a bound template's markup is recorded under
/// that template's display name. Markup hits carry no line information, so
/// method hits map to an empty citation list and property hits record the
/// display name once. Without a symbol table there are no declared members
/// to match, so only the `visualforce` entries are recorded.
fn record_template_bindings(
    object: &mut ReferenceObject,
    table: Option<&SymbolTable>,
    bound: &[&UiTemplate],
) {
    for template in bound {
        object.visualforce.push(template.display_name());
    }

    let Some(table) = table else {
        return;
    };

    for method in &table.methods {
        let merge_field = format!("{{!{}}}", method.name);
        for template in bound {
            if template.body.contains(&merge_field) {
                object
                    .methods
                    .entry(method.name.clone())
                    .or_default()
                    .entry(template.display_name())
                    .or_default();
            }
        }
    }

    for property in &table.properties {
        let merge_field = format!("{{!{}}}", property.name);
        for template in bound {
            if template.body.contains(&merge_field) {
                let display = template.display_name();
                let entries = object.properties.entry(property.name.clone()).or_default();
                if !entries.contains(&display) {
                    entries.push(display);
                }
            }
        }
    }
}
