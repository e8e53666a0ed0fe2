//! Master data: parties, products and users
//!
//! Same shape as the posting engine: pure `(&AppState, draft) -> Posting`.
//! Deleting a party or product leaves invoices that reference it alone; their
//! denormalized names keep them displayable.

use crate::{
    posting::Posting,
    types::{AppState, Party, PartyId, PartyKind, Product, ProductId, Role, User, UserId},
    Error, Result,
};
use rust_decimal::Decimal;

/// New party
#[derive(Debug, Clone, PartialEq)]
pub struct PartyDraft {
    /// Human-facing code
    pub code: String,
    /// Display name, required
    pub name: String,
    /// Customer / Supplier / Both
    pub kind: PartyKind,
    /// Category
    pub category: String,
    /// Phone
    pub phone: String,
    /// Opening balance, also the starting current balance
    pub opening_balance: Decimal,
}

/// New product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    /// Lookup key, required and unique
    pub code: String,
    /// Display name, required
    pub name: String,
    /// Quantity on hand at creation
    pub opening_qty: Decimal,
    /// Value of that quantity
    pub opening_value: Decimal,
}

/// New user with an already hashed password
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    /// Login name, required and unique
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Role
    pub role: Role,
    /// Permissions; empty takes the role defaults
    pub permissions: Vec<String>,
}

/// Add a party
pub fn add_party(state: &AppState, draft: PartyDraft) -> Result<Posting<Party>> {
    if draft.name.trim().is_empty() {
        return Err(Error::Validation("Party name is required".to_string()));
    }

    let party = Party {
        id: PartyId::generate(),
        code: draft.code,
        name: draft.name,
        kind: draft.kind,
        category: draft.category,
        phone: draft.phone,
        opening_balance: draft.opening_balance,
        current_balance: draft.opening_balance,
    };

    let mut next = state.clone();
    next.parties.push(party.clone());
    Ok(Posting::new(next, party))
}

/// Append a confirmed batch of imported parties
pub fn import_parties(state: &AppState, parties: Vec<Party>) -> Result<Posting<usize>> {
    let count = parties.len();
    let mut next = state.clone();
    next.parties.extend(parties);
    Ok(Posting::new(next, count))
}

/// Remove a party
pub fn remove_party(state: &AppState, id: &PartyId) -> Result<Posting<Party>> {
    let party = state
        .party(id)
        .cloned()
        .ok_or_else(|| Error::PartyNotFound(id.to_string()))?;

    let mut next = state.clone();
    next.parties.retain(|p| &p.id != id);
    Ok(Posting::new(next, party))
}

/// Add a product; average cost starts at opening value / opening quantity
pub fn add_product(state: &AppState, draft: ProductDraft) -> Result<Posting<Product>> {
    if draft.code.trim().is_empty() || draft.name.trim().is_empty() {
        return Err(Error::Validation(
            "Product code and name are required".to_string(),
        ));
    }
    if state.product_by_code(&draft.code).is_some() {
        return Err(Error::Duplicate(format!("product code {}", draft.code)));
    }

    let avg_cost = draft
        .opening_value
        .checked_div(draft.opening_qty)
        .unwrap_or(Decimal::ZERO);

    let product = Product {
        id: ProductId::generate(),
        code: draft.code,
        name: draft.name,
        opening_qty: draft.opening_qty,
        opening_value: draft.opening_value,
        current_qty: draft.opening_qty,
        avg_cost,
    };

    let mut next = state.clone();
    next.products.push(product.clone());
    Ok(Posting::new(next, product))
}

/// Remove a product
pub fn remove_product(state: &AppState, id: &ProductId) -> Result<Posting<Product>> {
    let product = state
        .products
        .iter()
        .find(|p| &p.id == id)
        .cloned()
        .ok_or_else(|| Error::ProductNotFound(id.to_string()))?;

    let mut next = state.clone();
    next.products.retain(|p| &p.id != id);
    Ok(Posting::new(next, product))
}

/// Add a user
pub fn add_user(state: &AppState, draft: UserDraft) -> Result<Posting<User>> {
    if draft.username.trim().is_empty() || draft.password_hash.is_empty() {
        return Err(Error::Validation(
            "Username and password are required".to_string(),
        ));
    }
    if state.user_by_name(&draft.username).is_some() {
        return Err(Error::Duplicate(format!("username {}", draft.username)));
    }

    let permissions = if draft.permissions.is_empty() {
        draft.role.default_permissions()
    } else {
        draft.permissions
    };

    let user = User {
        id: UserId::generate(),
        username: draft.username,
        password: None,
        password_hash: Some(draft.password_hash),
        role: draft.role,
        permissions,
    };

    let mut next = state.clone();
    next.users.push(user.clone());
    Ok(Posting::new(next, user))
}

/// Remove a user
pub fn remove_user(state: &AppState, id: &UserId) -> Result<Posting<User>> {
    let user = state
        .users
        .iter()
        .find(|u| &u.id == id)
        .cloned()
        .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

    let mut next = state.clone();
    next.users.retain(|u| &u.id != id);
    Ok(Posting::new(next, user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_draft(code: &str, qty: i64, value: i64) -> ProductDraft {
        ProductDraft {
            code: code.to_string(),
            name: "Widget".to_string(),
            opening_qty: Decimal::from(qty),
            opening_value: Decimal::from(value),
        }
    }

    #[test]
    fn test_add_party_starts_at_opening_balance() {
        let draft = PartyDraft {
            code: "C1".to_string(),
            name: "Ali".to_string(),
            kind: PartyKind::Customer,
            category: "retail".to_string(),
            phone: String::new(),
            opening_balance: Decimal::from(150),
        };
        let posting = add_party(&AppState::default(), draft).unwrap();
        assert_eq!(posting.output.current_balance, Decimal::from(150));
        assert_eq!(posting.state.parties.len(), 1);
    }

    #[test]
    fn test_add_product_average_cost() {
        let posting = add_product(&AppState::default(), product_draft("P1", 4, 10)).unwrap();
        assert_eq!(posting.output.avg_cost, Decimal::new(25, 1));
        assert_eq!(posting.output.current_qty, Decimal::from(4));

        let empty = add_product(&AppState::default(), product_draft("P2", 0, 0)).unwrap();
        assert_eq!(empty.output.avg_cost, Decimal::ZERO);
    }

    #[test]
    fn test_add_product_rejects_duplicate_code() {
        let first = add_product(&AppState::default(), product_draft("P1", 0, 0)).unwrap();
        let err = add_product(&first.state, product_draft("P1", 1, 1)).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[test]
    fn test_add_user_uses_role_defaults() {
        let draft = UserDraft {
            username: "sara".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::Accountant,
            permissions: vec![],
        };
        let posting = add_user(&AppState::default(), draft.clone()).unwrap();
        assert!(posting.output.can("treasury"));
        assert!(!posting.output.can("settings"));

        let err = add_user(&posting.state, draft).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[test]
    fn test_remove_unknown_party() {
        let err = remove_party(&AppState::default(), &PartyId::new("nope")).unwrap_err();
        assert!(matches!(err, Error::PartyNotFound(_)));
    }
}
