//! Inverse mutations.
//!
//! Every function here is pure: given the pre-mutation state it computes
//! the statement that undoes a forward mutation, and for modifies also the
//! post-mutation state. Nothing touches the remote store.
//!
//! | Forward | Reverse |
//! |---|---|
//! | add | delete |
//! | delete | add of the pre-state without server-generated attributes |
//! | modify add values | modify delete values |
//! | modify delete values | modify add values |
//! | modify delete all / replace | replace with old values, or delete all if absent |
//! | rename | rename back, moving back if the forward moved |

use crate::error::{ConflictKind, CoreError, CoreResult};
use crate::statement::Statement;
use ldaptx_codec::{AttributeSet, Dn, Modification, ModifyOp, Rdn};

/// The inverse of adding `dn`.
#[must_use]
pub fn reverse_add(dn: &Dn) -> Statement {
    Statement::Delete { dn: dn.clone() }
}

/// The inverse of deleting `dn` whose state was `pre`. Attributes named in
/// `strip` are left out because the server regenerates them.
#[must_use]
pub fn reverse_delete(dn: &Dn, pre: &AttributeSet, strip: &[String]) -> Statement {
    Statement::Add {
        dn: dn.clone(),
        attributes: pre.without(strip),
    }
}

/// Applies `changes` to `pre`, returning the post-state and the changes that
/// restore `pre`, in the order they must be sent.
///
/// # Errors
///
/// Returns [`CoreError::AttributeConflict`] with
/// [`ConflictKind::TypeOrValueExists`] when adding a value that is present,
/// and with [`ConflictKind::NoSuchAttribute`] when deleting a value or an
/// attribute that is absent.
pub fn apply_modifications(
    dn: &Dn,
    pre: &AttributeSet,
    changes: &[Modification],
) -> CoreResult<(AttributeSet, Vec<Modification>)> {
    let mut post = pre.clone();
    let mut reverse = Vec::with_capacity(changes.len());

    for change in changes {
        let name = change.attribute.as_str();
        match change.op {
            ModifyOp::Add if change.values.is_empty() => {}
            ModifyOp::Add => {
                if change.values.iter().any(|v| post.contains_value(name, v)) {
                    return Err(CoreError::conflict(dn, ConflictKind::TypeOrValueExists, name));
                }
                post.add_values(change.attribute.clone(), &change.values);
                reverse.push(Modification::new(
                    ModifyOp::Delete,
                    change.attribute.clone(),
                    change.values.clone(),
                ));
            }
            ModifyOp::Delete if !change.values.is_empty() => {
                if change.values.iter().any(|v| !post.contains_value(name, v)) {
                    return Err(CoreError::conflict(dn, ConflictKind::NoSuchAttribute, name));
                }
                post.remove_values(name, &change.values);
                reverse.push(Modification::new(
                    ModifyOp::Add,
                    change.attribute.clone(),
                    change.values.clone(),
                ));
            }
            // Delete-all and replace both discard the prior values.
            ModifyOp::Delete | ModifyOp::Replace => {
                let old = post.insert(change.attribute.clone(), change.values.clone());
                let undo = match old {
                    Some(old) => Modification::new(ModifyOp::Replace, change.attribute.clone(), old),
                    None if change.op == ModifyOp::Delete => {
                        return Err(CoreError::conflict(dn, ConflictKind::NoSuchAttribute, name));
                    }
                    None if change.values.is_empty() => {
                        Modification::new(ModifyOp::Replace, change.attribute.clone(), Vec::new())
                    }
                    None => Modification::delete_all(change.attribute.clone()),
                };
                reverse.push(undo);
            }
        }
    }

    reverse.reverse();
    Ok((post, reverse))
}

/// The inverse of renaming `dn` to `new_rdn`, optionally under
/// `new_parent`. Returns the new name alongside.
///
/// # Errors
///
/// Returns [`CoreError::InvalidOperation`] for the root name, which has no
/// component to rename.
pub fn reverse_rename(
    dn: &Dn,
    new_rdn: &Rdn,
    new_parent: Option<&Dn>,
) -> CoreResult<(Dn, Statement)> {
    let (Some(old_rdn), Some(old_parent)) = (dn.rdn(), dn.parent()) else {
        return Err(CoreError::invalid_operation("cannot rename the root entry"));
    };
    let new_dn = new_parent.unwrap_or(&old_parent).child(new_rdn.clone());
    let reverse = Statement::Rename {
        dn: new_dn.clone(),
        new_rdn: old_rdn.clone(),
        new_parent: new_parent.map(|_| old_parent.clone()),
    };
    Ok((new_dn, reverse))
}

/// Applies `changes` to `state` and returns only the result. Used to
/// replay reverse changes against a post-state.
///
/// # Errors
///
/// Same conditions as [`apply_modifications`].
pub fn replay(dn: &Dn, state: &AttributeSet, changes: &[Modification]) -> CoreResult<AttributeSet> {
    apply_modifications(dn, state, changes).map(|(post, _)| post)
}
