// Ownership rules applied to a replace, by diffing the stored and submitted documents

use crate::document::{Document, Role, User};
use crate::error::{FarmStoreError, Result};
use std::collections::HashMap;

/// Check that `actor` is allowed to turn `current` into `next`.
///
/// Admins may change anything. Everyone else:
/// - may not add, change or remove users;
/// - may touch a product only as a farmer, and only one they own before and after;
/// - may not change or remove existing orders, and may only add orders they buy;
/// - may not change or remove existing chats, and may only add chats they send.
pub fn check_replace(actor: &User, current: &Document, next: &Document) -> Result<()> {
    if actor.role == Role::Admin {
        return Ok(());
    }

    check_users(current, next)?;
    check_products(actor, current, next)?;
    check_append_only(
        "orders",
        &index(&current.orders, |o| &o.id),
        &index(&next.orders, |o| &o.id),
        |o| o.buyer_id == actor.id,
    )?;
    check_append_only(
        "chats",
        &index(&current.chats, |c| &c.id),
        &index(&next.chats, |c| &c.id),
        |c| c.user1 == actor.id,
    )?;

    Ok(())
}

fn index<'a, T>(items: &'a [T], key: impl Fn(&T) -> &String) -> HashMap<&'a str, &'a T> {
    items.iter().map(|item| (key(item).as_str(), item)).collect()
}

fn check_users(current: &Document, next: &Document) -> Result<()> {
    let before = index(&current.users, |u| &u.id);
    let after = index(&next.users, |u| &u.id);
    if before != after {
        return Err(FarmStoreError::Forbidden(
            "only an admin may change users".into(),
        ));
    }
    Ok(())
}

fn check_products(actor: &User, current: &Document, next: &Document) -> Result<()> {
    let before = index(&current.products, |p| &p.id);
    let after = index(&next.products, |p| &p.id);

    for id in before.keys().chain(after.keys()) {
        let old = before.get(id);
        let new = after.get(id);
        if old == new {
            continue;
        }
        let owns = |p: Option<&&crate::document::Product>| {
            p.map_or(true, |p| p.farmer_id == actor.id)
        };
        if actor.role != Role::Farmer || !owns(old) || !owns(new) {
            return Err(FarmStoreError::Forbidden(format!(
                "user '{}' may not modify product '{id}'",
                actor.id
            )));
        }
    }
    Ok(())
}

fn check_append_only<T: PartialEq>(
    collection: &str,
    before: &HashMap<&str, &T>,
    after: &HashMap<&str, &T>,
    may_add: impl Fn(&T) -> bool,
) -> Result<()> {
    for (id, old) in before {
        match after.get(id) {
            Some(new) if new == old => {}
            _ => {
                return Err(FarmStoreError::Forbidden(format!(
                    "{collection} are immutable: '{id}' was changed or removed"
                )))
            }
        }
    }
    for (id, new) in after {
        if !before.contains_key(id) && !may_add(new) {
            return Err(FarmStoreError::Forbidden(format!(
                "'{id}' in {collection} was not created by its author"
            )));
        }
    }
    Ok(())
}
