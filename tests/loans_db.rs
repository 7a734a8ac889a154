//! Loan lifecycle tests against a real PostgreSQL database.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::PgPool;

use perpustakaan_server::{
    config::AppConfig,
    error::AppError,
    models::{
        item::CreateItem,
        loan::{CreateLoan, LoanQuery, LoanStatus, UpdateLoanFee},
        user::UserClaims,
    },
    repository::Repository,
    services::{storage::UploadedFile, Services},
};

struct Fixture {
    repository: Repository,
    services: Services,
    config: AppConfig,
}

impl Fixture {
    fn new(pool: PgPool) -> Self {
        Self::with_config(pool, AppConfig::default())
    }

    fn with_config(pool: PgPool, mut config: AppConfig) -> Self {
        config.storage.upload_dir = std::env::temp_dir()
            .join(format!("perpustakaan-tests-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        let repository = Repository::new(pool);
        let services = Services::new(repository.clone(), &config);
        Self {
            repository,
            services,
            config,
        }
    }

    async fn user(&self, name: &str, groups: &[&str]) -> UserClaims {
        let hash = self.services.users.hash_password("rahasia").unwrap();
        let user = self.repository.users.create(name, &hash, groups).await.unwrap();
        let now = Utc::now().timestamp();
        UserClaims {
            sub: user.username,
            user_id: user.id,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            exp: now + 3600,
            iat: now,
        }
    }

    async fn item(&self, stock: i32) -> i32 {
        let category = self.repository.categories.create("Elektronik").await.unwrap();
        self.repository
            .items
            .create(&CreateItem {
                name: "Proyektor".into(),
                category_id: category.id,
                stock: Some(stock),
            })
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, item_id: i32) -> i32 {
        self.repository.items.get_by_id(item_id).await.unwrap().stock
    }
}

fn form() -> CreateLoan {
    CreateLoan {
        contact_number: "081234567890".into(),
        class_name: "XII RPL 1".into(),
        department: "RPL".into(),
        signature: "data:image/png;base64,AAAA".into(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_borrow_takes_stock(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(2).await;

    let (loan, remaining) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();

    assert_eq!(remaining, 1);
    assert_eq!(fx.stock(item).await, 1);
    assert_eq!(loan.status, LoanStatus::Borrowed);
    assert_eq!(loan.fee, 0);
    assert!(!loan.staff_verified);
    assert!(loan.due_at > loan.loan_date);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_out_of_stock_creates_nothing(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(0).await;

    let result = fx.services.loans.create_loan(&budi, item, form()).await;

    assert!(matches!(result, Err(AppError::OutOfStock(_))));
    assert_eq!(fx.stock(item).await, 0);
    assert!(fx.services.loans.my_loans(&budi).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_borrow_unknown_item(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;

    let result = fx.services.loans.create_loan(&budi, 9999, form()).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_borrow_of_last_unit(pool: PgPool) {
    const BORROWERS: usize = 10;

    let fx = Fixture::new(pool);
    let item = fx.item(1).await;

    let mut handles = Vec::with_capacity(BORROWERS);
    for n in 0..BORROWERS {
        let claims = fx.user(&format!("siswa{}", n), &[]).await;
        let services = fx.services.clone();
        handles.push(tokio::spawn(async move {
            services.loans.create_loan(&claims, item, form()).await
        }));
    }

    let mut borrowed = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => borrowed += 1,
            Err(AppError::OutOfStock(_)) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(borrowed, 1);
    assert_eq!(out_of_stock, BORROWERS - 1);
    assert_eq!(fx.stock(item).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_late_return_charges_per_day(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(1).await;

    // Due three local days ago
    let due_at = Utc::now() - Duration::days(3);
    let (loan, _) = fx
        .repository
        .loans
        .create_with_stock(budi.user_id, item, &form(), due_at - Duration::days(1), due_at)
        .await
        .unwrap();

    let returned = fx.services.loans.return_loan(&budi, loan.id, None).await.unwrap();

    assert_eq!(returned.status, LoanStatus::Returned);
    assert_eq!(returned.fee, 3 * fx.config.loans.fee_per_day);
    assert!(returned.returned_date.is_some());
    assert_eq!(fx.stock(item).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_on_time_return_is_free(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(1).await;

    let (loan, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();
    let returned = fx.services.loans.return_loan(&budi, loan.id, None).await.unwrap();

    assert_eq!(returned.fee, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_double_return_is_refused(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(1).await;

    let due_at = Utc::now() - Duration::days(2);
    let (loan, _) = fx
        .repository
        .loans
        .create_with_stock(budi.user_id, item, &form(), due_at - Duration::days(1), due_at)
        .await
        .unwrap();

    let first = fx.services.loans.return_loan(&budi, loan.id, None).await.unwrap();
    let second = fx.services.loans.return_loan(&budi, loan.id, None).await;

    assert!(matches!(second, Err(AppError::InvalidState(_))));
    let stored = fx.repository.loans.get_by_id(loan.id).await.unwrap();
    assert_eq!(stored.fee, first.fee);
    assert_eq!(stored.returned_date, first.returned_date);
    assert_eq!(fx.stock(item).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_return_by_other_user_is_not_found(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let siti = fx.user("siti", &[]).await;
    let item = fx.item(1).await;

    let (loan, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();
    let result = fx.services.loans.return_loan(&siti, loan.id, None).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(fx.services.loans.get_loan(&siti, loan.id).await.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_verification_queues(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let staff = fx.user("petugas1", &["petugas"]).await;
    let admin = fx.user("admin1", &["admin"]).await;
    let item = fx.item(3).await;

    let (first, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();
    let (second, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();

    let pending = fx.services.verification.pending(&staff).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(fx.services.loans.admin_loans(&admin, &LoanQuery::default()).await.unwrap().is_empty());

    let verified = fx.services.verification.verify(&staff, first.id).await.unwrap();
    assert!(verified.staff_verified);
    // verifying again changes nothing
    let again = fx.services.verification.verify(&staff, first.id).await.unwrap();
    assert!(again.staff_verified);

    let pending = fx.services.verification.pending(&staff).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].loan.id, second.id);

    let active = fx.services.verification.active(&staff).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].loan.id, first.id);
    assert_eq!(active[0].username, "budi");
    assert_eq!(active[0].item_name, "Proyektor");

    let admin_view = fx.services.loans.admin_loans(&admin, &LoanQuery::default()).await.unwrap();
    assert_eq!(admin_view.len(), 1);
    assert_eq!(admin_view[0].loan.id, first.id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_reject_deletes_loan(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let staff = fx.user("petugas1", &["petugas"]).await;
    let item = fx.item(1).await;

    let (loan, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();
    fx.services.verification.reject(&staff, loan.id).await.unwrap();

    assert!(matches!(
        fx.repository.loans.get_by_id(loan.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(fx.services.verification.pending(&staff).await.unwrap().is_empty());
    // stock is not restored on reject by default
    assert_eq!(fx.stock(item).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_plain_user_cannot_verify(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(1).await;

    let (loan, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();
    let result = fx.services.verification.verify(&budi, loan.id).await;

    assert!(matches!(result, Err(AppError::Authorization(_))));
    let stored = fx.repository.loans.get_by_id(loan.id).await.unwrap();
    assert!(!stored.staff_verified);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_admin_overrides(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let admin = fx.user("admin1", &["admin"]).await;
    let item = fx.item(1).await;

    let due_at = Utc::now() - Duration::days(1);
    let (loan, _) = fx
        .repository
        .loans
        .create_with_stock(budi.user_id, item, &form(), due_at - Duration::days(1), due_at)
        .await
        .unwrap();

    let returned = fx
        .services
        .loans
        .admin_update_status(&admin, loan.id, LoanStatus::Returned)
        .await
        .unwrap();
    assert_eq!(returned.status, LoanStatus::Returned);
    assert_eq!(returned.fee, fx.config.loans.fee_per_day);

    let reopen = fx
        .services
        .loans
        .admin_update_status(&admin, loan.id, LoanStatus::Borrowed)
        .await;
    assert!(matches!(reopen, Err(AppError::InvalidState(_))));

    let waived = fx
        .services
        .loans
        .admin_set_fee(&admin, loan.id, UpdateLoanFee { fee: 0 })
        .await
        .unwrap();
    assert_eq!(waived.fee, 0);

    let negative = fx
        .services
        .loans
        .admin_set_fee(&admin, loan.id, UpdateLoanFee { fee: -5 })
        .await;
    assert!(matches!(negative, Err(AppError::Validation(_))));

    let refused = fx
        .services
        .loans
        .admin_set_fee(&budi, loan.id, UpdateLoanFee { fee: 0 })
        .await;
    assert!(matches!(refused, Err(AppError::Authorization(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_registration_and_staff_login(pool: PgPool) {
    use perpustakaan_server::models::user::{RegisterStaff, RegisterUser};

    let fx = Fixture::new(pool);

    fx.services
        .users
        .register(RegisterUser {
            username: "budi".into(),
            password: "rahasia".into(),
        })
        .await
        .unwrap();
    let duplicate = fx
        .services
        .users
        .register(RegisterUser {
            username: "budi".into(),
            password: "lain".into(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Validation(_))));

    let mismatch = fx
        .services
        .users
        .register_staff(RegisterStaff {
            username: "petugas1".into(),
            password: "rahasia".into(),
            confirm: "rahasia2".into(),
        })
        .await;
    assert!(matches!(mismatch, Err(AppError::Validation(_))));

    fx.services
        .users
        .register_staff(RegisterStaff {
            username: "petugas1".into(),
            password: "rahasia".into(),
            confirm: "rahasia".into(),
        })
        .await
        .unwrap();

    let (_, claims) = fx.services.users.authenticate_staff("petugas1", "rahasia").await.unwrap();
    assert!(claims.require_staff().is_ok());

    assert!(fx.services.users.authenticate("budi", "rahasia").await.is_ok());
    assert!(matches!(
        fx.services.users.authenticate_staff("budi", "rahasia").await,
        Err(AppError::Authentication(_))
    ));
    assert!(matches!(
        fx.services.users.authenticate("budi", "salah").await,
        Err(AppError::Authentication(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_failed_return_leaves_no_proof_behind(pool: PgPool) {
    // a negative rate makes the fee violate the fee >= 0 column check
    let mut config = AppConfig::default();
    config.loans.fee_per_day = -1;
    let fx = Fixture::with_config(pool, config);
    let budi = fx.user("budi", &[]).await;
    let item = fx.item(1).await;

    let due_at = Utc::now() - Duration::days(2);
    let (loan, _) = fx
        .repository
        .loans
        .create_with_stock(budi.user_id, item, &form(), due_at - Duration::days(1), due_at)
        .await
        .unwrap();

    let proof = UploadedFile {
        file_name: Some("bukti.png".into()),
        bytes: vec![137, 80, 78, 71],
    };
    let result = fx.services.loans.return_loan(&budi, loan.id, Some(proof)).await;

    assert!(matches!(result, Err(AppError::Database(_))));
    let stored = fx.repository.loans.get_by_id(loan.id).await.unwrap();
    assert_eq!(stored.status, LoanStatus::Borrowed);
    assert!(stored.return_proof.is_none());

    let proofs = fx.services.storage.root().join("return_proofs");
    let mut entries = tokio::fs::read_dir(&proofs).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());

    let _ = tokio::fs::remove_dir_all(fx.services.storage.root()).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_admin_list_filters(pool: PgPool) {
    let fx = Fixture::new(pool);
    let budi = fx.user("budi", &[]).await;
    let siti = fx.user("siti", &[]).await;
    let staff = fx.user("petugas1", &["petugas"]).await;
    let admin = fx.user("admin1", &["admin"]).await;
    let item = fx.item(5).await;

    let (kept, _) = fx.services.loans.create_loan(&budi, item, form()).await.unwrap();
    let (returned, _) = fx.services.loans.create_loan(&siti, item, form()).await.unwrap();
    fx.services.verification.verify(&staff, kept.id).await.unwrap();
    fx.services.verification.verify(&staff, returned.id).await.unwrap();
    fx.services.loans.return_loan(&siti, returned.id, None).await.unwrap();

    let query = LoanQuery {
        status: Some(LoanStatus::Borrowed),
        ..Default::default()
    };
    let borrowed = fx.services.loans.admin_loans(&admin, &query).await.unwrap();
    assert_eq!(borrowed.len(), 1);
    assert_eq!(borrowed[0].loan.id, kept.id);

    let query = LoanQuery {
        q: Some("SIT".into()),
        ..Default::default()
    };
    let by_name = fx.services.loans.admin_loans(&admin, &query).await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].loan.id, returned.id);

    let query = LoanQuery {
        q: Some("proyek".into()),
        ..Default::default()
    };
    assert_eq!(fx.services.loans.admin_loans(&admin, &query).await.unwrap().len(), 2);

    let today = Utc::now()
        .with_timezone(&fx.config.loans.local_offset())
        .date_naive();
    let query = LoanQuery {
        from: Some(today),
        to: Some(today),
        ..Default::default()
    };
    assert_eq!(fx.services.loans.admin_loans(&admin, &query).await.unwrap().len(), 2);

    let query = LoanQuery {
        to: today.pred_opt(),
        ..Default::default()
    };
    assert!(fx.services.loans.admin_loans(&admin, &query).await.unwrap().is_empty());
}
