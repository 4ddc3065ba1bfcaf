//! Category management for the authenticated user.

use crate::error::{Error, Result};
use crate::store::{CategoryOrder, Store};
use crate::types::{Category, CategoryWithCount, User};

pub const DEFAULT_ICON: &str = "📁";

const MAX_NAME_LEN: usize = 100;
const MAX_ICON_LEN: usize = 10;

pub fn create(
    store: &dyn Store,
    user: &User,
    name: &str,
    icon: Option<&str>,
) -> Result<CategoryWithCount> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Category name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "Category name must be at most {MAX_NAME_LEN} characters"
        )));
    }

    let icon = icon.map(str::trim).filter(|i| !i.is_empty()).unwrap_or(DEFAULT_ICON);
    if icon.chars().count() > MAX_ICON_LEN {
        return Err(Error::validation(format!(
            "Category icon must be at most {MAX_ICON_LEN} characters"
        )));
    }

    let category = store.create_category(user.id, name, icon)?;
    tracing::info!(user_id = user.id, category_id = category.id, "created category");

    Ok(CategoryWithCount {
        category,
        document_count: 0,
    })
}

/// Deletes an owned category. Its documents stay, uncategorized.
pub fn delete(store: &dyn Store, user: &User, id: i64) -> Result<()> {
    if !store.delete_category(user.id, id)? {
        return Err(Error::NotFound);
    }
    tracing::info!(user_id = user.id, category_id = id, "deleted category");
    Ok(())
}

pub fn list(store: &dyn Store, user: &User, order: CategoryOrder) -> Result<Vec<CategoryWithCount>> {
    store.list_categories(user.id, order)
}

/// Resolves an upload's category field. Integers are tried as an id first,
/// then as a name. Blank, `none` and unknown values mean uncategorized.
pub fn resolve(store: &dyn Store, user: &User, raw: Option<&str>) -> Result<Option<Category>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    if let Ok(id) = raw.parse::<i64>() {
        if let Some(category) = store.get_category(user.id, id)? {
            return Ok(Some(category));
        }
    }

    let category = store.get_category_by_name(user.id, raw)?;
    if category.is_none() {
        tracing::debug!(user_id = user.id, category = raw, "unknown category, storing uncategorized");
    }
    Ok(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordHasher;
    use crate::service::accounts::{self, Registration};
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    fn register(store: &SqliteStore, email: &str) -> User {
        accounts::register(
            store,
            &PasswordHasher::new(),
            &Registration {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: email.to_string(),
                password: "pw".to_string(),
                ..Registration::default()
            },
        )
        .unwrap()
    }

    fn setup() -> (TempDir, SqliteStore, User, User) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let ada = register(&store, "ada@example.com");
        let bob = register(&store, "bob@example.com");
        (temp_dir, store, ada, bob)
    }

    #[test]
    fn test_create_defaults_icon_and_trims() {
        let (_dir, store, ada, _) = setup();

        let created = create(&store, &ada, "  Taxes  ", None).unwrap();
        assert_eq!(created.category.name, "Taxes");
        assert_eq!(created.category.icon, DEFAULT_ICON);
        assert_eq!(created.document_count, 0);

        let created = create(&store, &ada, "Receipts", Some("  ")).unwrap();
        assert_eq!(created.category.icon, DEFAULT_ICON);

        let created = create(&store, &ada, "Travel", Some("✈️")).unwrap();
        assert_eq!(created.category.icon, "✈️");
    }

    #[test]
    fn test_create_validation() {
        let (_dir, store, ada, _) = setup();

        assert!(matches!(create(&store, &ada, "   ", None), Err(Error::Validation(_))));
        assert!(matches!(
            create(&store, &ada, &"n".repeat(101), None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create(&store, &ada, "Icons", Some("0123456789x")),
            Err(Error::Validation(_))
        ));
        assert!(create(&store, &ada, &"n".repeat(100), None).is_ok());
    }

    #[test]
    fn test_duplicate_name_conflicts_per_owner() {
        let (_dir, store, ada, bob) = setup();

        create(&store, &ada, "Taxes", None).unwrap();
        assert!(matches!(
            create(&store, &ada, "Taxes", None),
            Err(Error::Conflict(_))
        ));
        assert!(create(&store, &bob, "Taxes", None).is_ok());
    }

    #[test]
    fn test_delete_requires_ownership() {
        let (_dir, store, ada, bob) = setup();
        let created = create(&store, &ada, "Taxes", None).unwrap();

        assert!(matches!(
            delete(&store, &bob, created.category.id),
            Err(Error::NotFound)
        ));
        delete(&store, &ada, created.category.id).unwrap();
        assert!(matches!(
            delete(&store, &ada, created.category.id),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_resolve() {
        let (_dir, store, ada, bob) = setup();
        let reports = store.get_category_by_name(ada.id, "Reports").unwrap().unwrap();
        let numeric = create(&store, &ada, "2026", None).unwrap().category;

        let by_id = resolve(&store, &ada, Some(&reports.id.to_string())).unwrap();
        assert_eq!(by_id.map(|c| c.id), Some(reports.id));

        let by_name = resolve(&store, &ada, Some("Reports")).unwrap();
        assert_eq!(by_name.map(|c| c.id), Some(reports.id));

        let numeric_name = resolve(&store, &ada, Some("2026")).unwrap();
        assert_eq!(numeric_name.map(|c| c.id), Some(numeric.id));

        assert!(resolve(&store, &ada, None).unwrap().is_none());
        assert!(resolve(&store, &ada, Some("")).unwrap().is_none());
        assert!(resolve(&store, &ada, Some("none")).unwrap().is_none());
        assert!(resolve(&store, &ada, Some("Nope")).unwrap().is_none());
        assert!(resolve(&store, &bob, Some(&reports.id.to_string())).unwrap().is_none());
    }
}
