#[cfg(test)]
mod tests {
    use empenhos::db::credentials::{hash_password, Credentials};
    use empenhos::db::db::Db;
    use empenhos::db::schema::ensure_schema;
    use empenhos::db::users::Users;
    use empenhos::libs::config::BootstrapConfig;
    use empenhos::libs::error::StoreError;
    use empenhos::libs::user::{NewUser, Role, UserUpdate};
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    const ADMIN: &str = "natan";
    const ADMIN_PASSWORD: &str = "bootstrap-pass";

    struct UserTestContext {
        _temp_dir: TempDir,
        db: Db,
        admin_id: i64,
    }

    impl TestContext for UserTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db = Db::open(temp_dir.path().join("empenhos.db"));
            let bootstrap = BootstrapConfig {
                username: ADMIN.to_string(),
                email: "admin@example.com".to_string(),
                password: Some(ADMIN_PASSWORD.to_string()),
            };
            ensure_schema(&db, &bootstrap).unwrap();
            let admin_id = db
                .scope(|tx| Users::new(tx).get_by_username(ADMIN))
                .unwrap()
                .unwrap()
                .id;
            UserTestContext {
                _temp_dir: temp_dir,
                db,
                admin_id,
            }
        }
    }

    fn add(db: &Db, username: &str, password: &str, role: Role) -> Result<i64, StoreError> {
        let user = NewUser::new(username, &format!("{}@example.com", username), password, role);
        db.scope(|tx| Users::new(tx).create(&user))
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_bootstrap_admin_exists(ctx: &mut UserTestContext) {
        let admin = ctx.db.scope(|tx| Users::new(tx).get(ctx.admin_id)).unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(ctx.db.scope(|tx| Users::new(tx).count_admins()).unwrap(), 1);
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_authenticate(ctx: &mut UserTestContext) {
        add(&ctx.db, "maria", "s3cret", Role::User).unwrap();

        let user = ctx.db.scope(|tx| Credentials::new(tx).authenticate("maria", "s3cret")).unwrap();
        assert_eq!(user.unwrap().username, "maria");

        let wrong_password = ctx.db.scope(|tx| Credentials::new(tx).authenticate("maria", "nope")).unwrap();
        let unknown_user = ctx.db.scope(|tx| Credentials::new(tx).authenticate("ghost", "s3cret")).unwrap();
        assert!(wrong_password.is_none());
        assert!(unknown_user.is_none());

        let verified = ctx.db.scope(|tx| Credentials::new(tx).verify("maria", "nope"));
        assert!(matches!(verified, Err(StoreError::AuthFailure)));
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_username_must_be_unique(ctx: &mut UserTestContext) {
        add(&ctx.db, "maria", "a", Role::User).unwrap();
        let result = add(&ctx.db, "maria", "b", Role::User);
        assert!(matches!(result, Err(StoreError::UsernameTaken(name)) if name == "maria"));

        let other = add(&ctx.db, "joao", "c", Role::User).unwrap();
        let rename = UserUpdate {
            username: "maria".to_string(),
            email: "joao@example.com".to_string(),
            password: None,
            role: Role::User,
        };
        let result = ctx.db.scope(|tx| Users::new(tx).update(other, &rename));
        assert!(matches!(result, Err(StoreError::UsernameTaken(_))));
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_update_without_password_keeps_hash(ctx: &mut UserTestContext) {
        let id = add(&ctx.db, "maria", "original", Role::User).unwrap();
        let user = ctx.db.scope(|tx| Users::new(tx).get(id)).unwrap().unwrap();

        let update = UserUpdate {
            email: "maria@prefeitura.example".to_string(),
            ..UserUpdate::from(&user)
        };
        ctx.db.scope(|tx| Users::new(tx).update(id, &update)).unwrap();

        let login = ctx.db.scope(|tx| Credentials::new(tx).authenticate("maria", "original")).unwrap();
        assert_eq!(login.unwrap().email, "maria@prefeitura.example");

        let update = UserUpdate {
            password: Some("changed".to_string()),
            ..update
        };
        ctx.db.scope(|tx| Users::new(tx).update(id, &update)).unwrap();
        let old = ctx.db.scope(|tx| Credentials::new(tx).authenticate("maria", "original")).unwrap();
        let new = ctx.db.scope(|tx| Credentials::new(tx).authenticate("maria", "changed")).unwrap();
        assert!(old.is_none());
        assert!(new.is_some());
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_last_admin_is_protected(ctx: &mut UserTestContext) {
        let result = ctx.db.scope(|tx| Users::new(tx).delete(ctx.admin_id));
        assert!(matches!(result, Err(StoreError::LastAdmin)));

        let admin = ctx.db.scope(|tx| Users::new(tx).get(ctx.admin_id)).unwrap().unwrap();
        let demote = UserUpdate {
            role: Role::User,
            ..UserUpdate::from(&admin)
        };
        let result = ctx.db.scope(|tx| Users::new(tx).update(ctx.admin_id, &demote));
        assert!(matches!(result, Err(StoreError::LastAdmin)));

        // With a second administrator the first can go.
        add(&ctx.db, "second", "pw", Role::Admin).unwrap();
        assert!(ctx.db.scope(|tx| Users::new(tx).delete(ctx.admin_id)).unwrap());
        assert_eq!(ctx.db.scope(|tx| Users::new(tx).count_admins()).unwrap(), 1);
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_delete_missing_user(ctx: &mut UserTestContext) {
        assert!(!ctx.db.scope(|tx| Users::new(tx).delete(12345)).unwrap());
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_list_filter(ctx: &mut UserTestContext) {
        add(&ctx.db, "maria", "pw", Role::User).unwrap();
        add(&ctx.db, "joao", "pw", Role::User).unwrap();

        let all = ctx.db.scope(|tx| Users::new(tx).list(None)).unwrap();
        let names: Vec<&str> = all.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["joao", "maria", ADMIN]);

        let filtered = ctx.db.scope(|tx| Users::new(tx).list(Some("MAR"))).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].username, "maria");

        // `_` is literal, not a wildcard.
        assert!(ctx.db.scope(|tx| Users::new(tx).list(Some("m_ria"))).unwrap().is_empty());
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_password_is_stored_hashed(ctx: &mut UserTestContext) {
        let id = add(&ctx.db, "maria", "plain", Role::User).unwrap();
        let stored: String = ctx
            .db
            .connect()
            .unwrap()
            .query_row("SELECT password_hash FROM users WHERE id = ?1", [id], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, hash_password("plain"));
        assert_ne!(stored, "plain");
    }

    #[test_context(UserTestContext)]
    #[test]
    fn test_blank_fields_are_rejected(ctx: &mut UserTestContext) {
        let result = add(&ctx.db, "  ", "pw", Role::User);
        assert!(matches!(result, Err(StoreError::Validation { field: "username", .. })));
        let result = add(&ctx.db, "maria", "", Role::User);
        assert!(matches!(result, Err(StoreError::Validation { field: "password", .. })));
    }
}
