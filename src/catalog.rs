//! Operation catalogs
//!
//! The fixed, closed sets of remote operations the dispatcher may execute.
//! Each entry pairs a name with a pre-validated JavaScript function
//! declaration that runs against a single target (`this`) via
//! `Runtime.callFunctionOn`. Caller data only ever arrives through the
//! declared formal parameters as structured call arguments; it is never
//! spliced into the body text, so a value containing quotes, backslashes or
//! script delimiters cannot change which operation runs.
//!
//! Two catalogs exist: element-scoped (target is a resolved DOM node) and
//! page-scoped (target is the page's global object). They are kept separate
//! so a page operation can never be dispatched against a node handle or
//! vice versa. Both are populated at compile time; no registration API
//! exists.

use crate::error::{CatalogScope, Error, Result};

/// A permitted remote operation
#[derive(Debug)]
pub struct OperationDef {
    /// Catalog key, matched exactly and case-sensitively
    pub name: &'static str,
    /// Function declaration evaluated with `this` bound to the target
    pub body: &'static str,
    /// Number of call arguments the declaration expects
    pub arity: usize,
}

/// Operations scoped to a resolved DOM node
pub static ELEMENT_OPS: &[OperationDef] = &[
    OperationDef {
        name: "click",
        body: "function() { this.click(); }",
        arity: 0,
    },
    OperationDef {
        name: "focus",
        body: "function() { this.focus(); }",
        arity: 0,
    },
    OperationDef {
        name: "setValue",
        // Assign through the prototype setter so framework-managed inputs
        // observe the change, then fire the events a real edit would.
        body: r#"function(value) {
            const v = String(value);
            const desc = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(this), 'value');
            if (desc && desc.set) { desc.set.call(this, v); } else { this.value = v; }
            this.dispatchEvent(new Event('input', { bubbles: true }));
            this.dispatchEvent(new Event('change', { bubbles: true }));
        }"#,
        arity: 1,
    },
    OperationDef {
        name: "getText",
        body: "function() { return this.innerText !== undefined ? this.innerText : (this.textContent || ''); }",
        arity: 0,
    },
    OperationDef {
        name: "getValue",
        body: "function() { return this.value === undefined || this.value === null ? '' : String(this.value); }",
        arity: 0,
    },
    OperationDef {
        name: "getAttribute",
        body: "function(name) { return this.getAttribute(String(name)); }",
        arity: 1,
    },
    OperationDef {
        name: "setAttribute",
        body: "function(name, value) { this.setAttribute(String(name), String(value)); }",
        arity: 2,
    },
    OperationDef {
        name: "isVisible",
        body: r#"function() {
            const rect = this.getBoundingClientRect();
            const style = window.getComputedStyle(this);
            return rect.width > 0 && rect.height > 0
                && style.display !== 'none' && style.visibility !== 'hidden';
        }"#,
        arity: 0,
    },
    OperationDef {
        name: "isEnabled",
        body: "function() { return !this.disabled; }",
        arity: 0,
    },
    OperationDef {
        name: "isChecked",
        body: "function() { return this.checked === true; }",
        arity: 0,
    },
    OperationDef {
        name: "selectOption",
        body: r#"function(value) {
            const v = String(value);
            let matched = false;
            for (const option of this.options || []) {
                option.selected = option.value === v;
                if (option.selected) { matched = true; }
            }
            if (!matched) { throw new Error('no option with value ' + JSON.stringify(v)); }
            this.dispatchEvent(new Event('change', { bubbles: true }));
        }"#,
        arity: 1,
    },
    OperationDef {
        name: "formData",
        body: r#"function() {
            const data = {};
            for (const field of this.elements || []) {
                if (field.name) { data[field.name] = field.value; }
            }
            return data;
        }"#,
        arity: 0,
    },
    OperationDef {
        name: "scrollIntoView",
        body: "function() { this.scrollIntoView({ block: 'center', inline: 'nearest' }); }",
        arity: 0,
    },
    OperationDef {
        name: "getRect",
        body: r#"function() {
            const rect = this.getBoundingClientRect();
            return { x: rect.x, y: rect.y, width: rect.width, height: rect.height };
        }"#,
        arity: 0,
    },
    OperationDef {
        name: "dragStart",
        body: "function() { this.dispatchEvent(new DragEvent('dragstart', { bubbles: true, cancelable: true })); }",
        arity: 0,
    },
    OperationDef {
        name: "drop",
        body: "function() { this.dispatchEvent(new DragEvent('drop', { bubbles: true, cancelable: true })); }",
        arity: 0,
    },
    OperationDef {
        name: "keyDown",
        body: "function(key) { this.dispatchEvent(new KeyboardEvent('keydown', { key: String(key), bubbles: true, cancelable: true })); }",
        arity: 1,
    },
    OperationDef {
        name: "keyUp",
        body: "function(key) { this.dispatchEvent(new KeyboardEvent('keyup', { key: String(key), bubbles: true, cancelable: true })); }",
        arity: 1,
    },
];

/// Operations scoped to the page's global object
pub static PAGE_OPS: &[OperationDef] = &[
    OperationDef {
        name: "scrollPosition",
        body: "function() { return { x: this.scrollX, y: this.scrollY }; }",
        arity: 0,
    },
    OperationDef {
        name: "scrollTo",
        body: "function(x, y) { this.scrollTo(Number(x), Number(y)); }",
        arity: 2,
    },
    OperationDef {
        name: "viewportSize",
        body: "function() { return { width: this.innerWidth, height: this.innerHeight }; }",
        arity: 0,
    },
    OperationDef {
        name: "readyState",
        body: "function() { return this.document.readyState; }",
        arity: 0,
    },
];

/// Look up an element-scoped operation by name
pub fn element_op(name: &str) -> Result<&'static OperationDef> {
    lookup(ELEMENT_OPS, CatalogScope::Element, name)
}

/// Look up a page-scoped operation by name
pub fn page_op(name: &str) -> Result<&'static OperationDef> {
    lookup(PAGE_OPS, CatalogScope::Page, name)
}

fn lookup(
    ops: &'static [OperationDef],
    scope: CatalogScope,
    name: &str,
) -> Result<&'static OperationDef> {
    ops.iter().find(|op| op.name == name).ok_or_else(|| {
        tracing::debug!(%scope, name, "rejected operation not in catalog");
        Error::UnknownOperation {
            scope,
            name: name.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_lookup_is_exact_and_case_sensitive() {
        assert!(element_op("click").is_ok());
        assert!(element_op("Click").is_err());
        assert!(element_op("click ").is_err());
        assert!(element_op("").is_err());
    }

    #[test]
    fn unknown_names_are_rejected_with_the_requested_name() {
        let err = element_op("deleteDatabase").unwrap_err();
        match err {
            Error::UnknownOperation { scope, name } => {
                assert_eq!(scope, CatalogScope::Element);
                assert_eq!(name, "deleteDatabase");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn catalogs_are_scoped_independently() {
        assert!(element_op("click").is_ok());
        assert!(page_op("click").is_err());
        assert!(page_op("readyState").is_ok());
        assert!(element_op("readyState").is_err());
    }

    #[test]
    fn operation_names_are_unique_within_each_catalog() {
        for ops in [ELEMENT_OPS, PAGE_OPS] {
            let mut names: Vec<_> = ops.iter().map(|op| op.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), ops.len());
        }
    }

    #[test]
    fn every_operation_is_a_function_declaration() {
        for op in ELEMENT_OPS.iter().chain(PAGE_OPS.iter()) {
            assert!(
                op.body.starts_with("function("),
                "'{}' body is not a function declaration",
                op.name
            );
        }
    }

    #[test]
    fn declared_arity_matches_the_declaration_parameters() {
        for op in ELEMENT_OPS.iter().chain(PAGE_OPS.iter()) {
            let open = op.body.find('(').expect("parameter list") + 1;
            let close = op.body[open..].find(')').expect("parameter list") + open;
            let params = op.body[open..close].trim();
            let declared = if params.is_empty() {
                0
            } else {
                params.split(',').count()
            };
            assert_eq!(op.arity, declared, "arity mismatch for '{}'", op.name);
        }
    }
}
