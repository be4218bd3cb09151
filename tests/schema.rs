#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use empenhos::db::credentials::{hash_password, Credentials};
    use empenhos::db::db::Db;
    use empenhos::db::empenhos::Empenhos;
    use empenhos::db::migrations::{get_db_version, needs_migration, MigrationManager};
    use empenhos::db::schema::ensure_schema;
    use empenhos::db::users::Users;
    use empenhos::libs::config::BootstrapConfig;
    use empenhos::libs::empenho::{EmpenhoDraft, Sector};
    use empenhos::libs::error::StoreError;
    use empenhos::libs::user::{NewUser, Role};
    use rusqlite::{params, Connection};
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct SchemaTestContext {
        _temp_dir: TempDir,
        db: Db,
        bootstrap: BootstrapConfig,
    }

    impl TestContext for SchemaTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db = Db::open(temp_dir.path().join("empenhos.db"));
            let bootstrap = BootstrapConfig {
                username: "natan".to_string(),
                email: "admin@example.com".to_string(),
                password: Some("bootstrap".to_string()),
            };
            SchemaTestContext {
                _temp_dir: temp_dir,
                db,
                bootstrap,
            }
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    impl SchemaTestContext {
        fn raw(&self) -> Connection {
            self.db.connect().unwrap()
        }
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_fresh_database(ctx: &mut SchemaTestContext) {
        assert!(ensure_schema(&ctx.db, &ctx.bootstrap).unwrap());

        let conn = ctx.raw();
        let (current, latest) = get_db_version(&conn).unwrap();
        assert_eq!(current, latest);
        assert_eq!(needs_migration(&conn).unwrap(), 0);

        let history = MigrationManager::new().get_migration_history(&conn).unwrap();
        let names: Vec<&str> = history.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["users_table", "empenhos_table", "search_indices"]);

        let admin = ctx
            .db
            .scope(|tx| Credentials::new(tx).authenticate("natan", "bootstrap"))
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_ensure_schema_is_idempotent(ctx: &mut SchemaTestContext) {
        assert!(ensure_schema(&ctx.db, &ctx.bootstrap).unwrap());
        ctx.db
            .scope(|tx| {
                Users::new(tx).create(&NewUser::new("maria", "maria@example.com", "pw", Role::User))?;
                Empenhos::new(tx).create(&EmpenhoDraft {
                    entry_date: day(),
                    number: 1042,
                    company: "Acme Ltda".to_string(),
                    sector: Sector::Semad,
                    note_number: "NF-55".to_string(),
                    note_date: day(),
                    value: 1500.0,
                    exit_date: day(),
                    notes: None,
                })
            })
            .unwrap();

        assert!(!ensure_schema(&ctx.db, &ctx.bootstrap).unwrap());
        assert!(!ensure_schema(&ctx.db, &ctx.bootstrap).unwrap());

        let users = ctx.db.scope(|tx| Users::new(tx).list(None)).unwrap();
        assert_eq!(users.len(), 2);
        let empenhos = ctx.db.scope(|tx| Empenhos::new(tx).list(None)).unwrap();
        assert_eq!(empenhos.len(), 1);
        let history = MigrationManager::new().get_migration_history(&ctx.raw()).unwrap();
        assert_eq!(history.len(), 3);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_existing_admin_is_not_overwritten(ctx: &mut SchemaTestContext) {
        ensure_schema(&ctx.db, &ctx.bootstrap).unwrap();

        let changed = BootstrapConfig {
            password: Some("different".to_string()),
            ..ctx.bootstrap.clone()
        };
        assert!(!ensure_schema(&ctx.db, &changed).unwrap());

        let login = ctx.db.scope(|tx| Credentials::new(tx).authenticate("natan", "bootstrap")).unwrap();
        assert!(login.is_some());
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_legacy_users_table_is_rebuilt(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch(
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY,
                    username TEXT UNIQUE NOT NULL,
                    password TEXT NOT NULL,
                    user_type TEXT
                )",
            )
            .unwrap();
            conn.execute(
                "INSERT INTO users (id, username, password, user_type) VALUES (?1, ?2, ?3, ?4)",
                params![7, "natan", hash_password("legacy-admin"), "admin"],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO users (id, username, password, user_type) VALUES (?1, ?2, ?3, ?4)",
                params![8, "clerk", hash_password("legacy-user"), "operator"],
            )
            .unwrap();
        }

        // The admin already exists, so nothing is seeded.
        assert!(!ensure_schema(&ctx.db, &ctx.bootstrap).unwrap());

        let users = ctx.db.scope(|tx| Users::new(tx).list(None)).unwrap();
        assert_eq!(users.len(), 2);

        let clerk = users.iter().find(|u| u.username == "clerk").unwrap();
        assert_eq!(clerk.id, 8);
        assert_eq!(clerk.email, "clerk@example.com");
        assert_eq!(clerk.role, Role::User);

        let admin = ctx
            .db
            .scope(|tx| Credentials::new(tx).authenticate("natan", "legacy-admin"))
            .unwrap()
            .unwrap();
        assert_eq!(admin.id, 7);
        assert_eq!(admin.role, Role::Admin);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_portuguese_empenhos_table_is_rebuilt(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch(
                "CREATE TABLE empenhos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    data_entrada TEXT NOT NULL,
                    numero INTEGER NOT NULL,
                    empresa TEXT NOT NULL,
                    setor TEXT NOT NULL,
                    numero_nota TEXT NOT NULL,
                    data_nota TEXT NOT NULL,
                    valor REAL NOT NULL,
                    data_saida TEXT NOT NULL,
                    observacao TEXT,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                );
                INSERT INTO empenhos (data_entrada, numero, empresa, setor, numero_nota, data_nota, valor, data_saida, observacao, created_at, updated_at)
                VALUES ('01/03/2024', 1042, 'Acme Ltda', 'SEMAD', 'NF-55', '01/03/2024', 1500.0, '05/03/2024', 'entregue', '2024-03-01 09:30:00', '2024-03-02 10:00:00');",
            )
            .unwrap();
        }

        ensure_schema(&ctx.db, &ctx.bootstrap).unwrap();

        let all = ctx.db.scope(|tx| Empenhos::new(tx).list(None)).unwrap();
        assert_eq!(all.len(), 1);
        let e = &all[0];
        assert_eq!(e.number, 1042);
        assert_eq!(e.company, "Acme Ltda");
        assert_eq!(e.sector, "SEMAD");
        assert_eq!(e.value, 1500.0);
        assert_eq!(e.notes.as_deref(), Some("entregue"));
        assert_eq!(e.created_at.to_string(), "2024-03-01 09:30:00");
        assert_eq!(e.updated_at.to_string(), "2024-03-02 10:00:00");
    }

    const PORTUGUESE_EMPENHOS: &str = "CREATE TABLE empenhos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_entrada TEXT NOT NULL,
        numero INTEGER NOT NULL,
        empresa TEXT NOT NULL,
        setor TEXT NOT NULL,
        numero_nota TEXT NOT NULL,
        data_nota TEXT NOT NULL,
        valor REAL NOT NULL,
        data_saida TEXT NOT NULL,
        observacao TEXT
    )";

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_legacy_dates_are_normalized(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch(PORTUGUESE_EMPENHOS).unwrap();
            for (numero, entrada, nota, saida) in [
                (1, "01/03/2024", "01/03/2024", "05/03/2024"),
                (2, "2024-03-02", "2024-03-02", "2024-03-06"),
                (3, "3/3/2024", "1/3/24", "10.03.2024"),
            ] {
                conn.execute(
                    "INSERT INTO empenhos (data_entrada, numero, empresa, setor, numero_nota, data_nota, valor, data_saida)
                     VALUES (?1, ?2, 'Acme Ltda', 'SEMAD', 'NF-1', ?3, 100.0, ?4)",
                    params![entrada, numero, nota, saida],
                )
                .unwrap();
            }
        }

        ensure_schema(&ctx.db, &ctx.bootstrap).unwrap();

        let all = ctx.db.scope(|tx| Empenhos::new(tx).list(None)).unwrap();
        let numbers: Vec<i64> = all.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);

        let iso = all.iter().find(|e| e.number == 2).unwrap();
        assert_eq!(iso.entry_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        let unpadded = all.iter().find(|e| e.number == 3).unwrap();
        assert_eq!(unpadded.note_date, day());
        assert_eq!(unpadded.exit_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let stored: String = ctx
            .raw()
            .query_row("SELECT entry_date FROM empenhos WHERE number = 3", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "03/03/2024");

        let searched = ctx.db.scope(|tx| Empenhos::new(tx).list(Some("acme"))).unwrap();
        assert_eq!(searched.len(), 3);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_unreadable_legacy_date_fails_cleanly(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch(PORTUGUESE_EMPENHOS).unwrap();
            conn.execute_batch(
                "INSERT INTO empenhos (data_entrada, numero, empresa, setor, numero_nota, data_nota, valor, data_saida)
                 VALUES ('01/03/2024', 1, 'Acme Ltda', 'SEMAD', 'NF-1', 'ontem', 100.0, '05/03/2024');",
            )
            .unwrap();
        }

        let err = ensure_schema(&ctx.db, &ctx.bootstrap).unwrap_err();
        match err {
            StoreError::Migration { version, message } => {
                assert_eq!(version, 2);
                assert!(message.contains("data_nota"), "{}", message);
                assert!(message.contains("ontem"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // The legacy table is left as it was.
        let conn = ctx.raw();
        assert_eq!(MigrationManager::new().get_current_version(&conn).unwrap(), 0);
        let data_nota: String = conn
            .query_row("SELECT data_nota FROM empenhos WHERE numero = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(data_nota, "ontem");
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_bootstrap_user_is_promoted_when_no_admin_remains(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT UNIQUE NOT NULL, password TEXT NOT NULL)")
                .unwrap();
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                params![1, "natan", hash_password("legacy-admin")],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                params![2, "clerk", hash_password("legacy-user")],
            )
            .unwrap();
        }

        assert!(!ensure_schema(&ctx.db, &ctx.bootstrap).unwrap());

        let (admins, clerk) = ctx
            .db
            .scope(|tx| {
                let users = Users::new(tx);
                Ok((users.count_admins()?, users.get_by_username("clerk")?))
            })
            .unwrap();
        assert_eq!(admins, 1);
        assert_eq!(clerk.unwrap().role, Role::User);

        let natan = ctx
            .db
            .scope(|tx| Credentials::new(tx).authenticate("natan", "legacy-admin"))
            .unwrap()
            .unwrap();
        assert_eq!(natan.role, Role::Admin);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_prototype_empenhos_table_is_adopted(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch(
                "CREATE TABLE empenhos (id INTEGER PRIMARY KEY, numero TEXT, descricao TEXT, valor REAL);
                 INSERT INTO empenhos (numero, descricao, valor) VALUES ('77', 'material de escritório', 320.5);",
            )
            .unwrap();
        }

        ensure_schema(&ctx.db, &ctx.bootstrap).unwrap();

        let all = ctx.db.scope(|tx| Empenhos::new(tx).list(None)).unwrap();
        assert_eq!(all.len(), 1);
        let e = &all[0];
        assert_eq!(e.number, 77);
        assert_eq!(e.company, "Empresa Anterior");
        assert_eq!(e.sector, "ADMINISTRAÇÃO");
        assert_eq!(e.note_number, "N/A");
        assert_eq!(e.notes.as_deref(), Some("material de escritório"));
        assert_eq!(e.entry_date, e.exit_date);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_failed_migration_leaves_database_untouched(ctx: &mut SchemaTestContext) {
        {
            let conn = ctx.raw();
            conn.execute_batch("CREATE TABLE empenhos (id INTEGER PRIMARY KEY, unexpected TEXT)").unwrap();
        }

        assert!(ensure_schema(&ctx.db, &ctx.bootstrap).is_err());

        let conn = ctx.raw();
        assert_eq!(MigrationManager::new().get_current_version(&conn).unwrap(), 0);
        let users_tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users_tables, 0);
    }
}
