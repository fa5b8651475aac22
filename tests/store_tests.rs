//! Service tests against a live PostgreSQL database.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;

use lab_lending::{
    config::LendingConfig,
    error::AppError,
    lending::{Availability, LoanEvent},
    models::{
        enums::{EquipmentStatus, LabMemberRole, LoanStatus, NotificationType, UserRole},
        equipment::CreateEquipment,
        lab::CreateLab,
        stats::{Interval, StatsRange},
        category::CreateCategory,
        user::CreateUser,
        CreateLoan, TransitionPayload,
    },
    repository::Repository,
    services::Services,
};

struct Fixture {
    services: Services,
    laboran: i32,
    student: i32,
    equipment_id: i32,
}

async fn setup(quantity: i32, needs_head_approval: bool) -> Fixture {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("Failed to migrate");

    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, LendingConfig::default());
    let tag = format!("{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());

    // The first administrator has to be promoted out of band
    let admin = services
        .users
        .create(&CreateUser {
            email: format!("admin-{}@lab.test", tag),
            full_name: "Admin".to_string(),
            nim_nik: None,
            role: Some(UserRole::Admin),
            phone: None,
        })
        .await
        .unwrap();
    sqlx::query("UPDATE users SET status = 'verified' WHERE id = $1")
        .bind(admin.id)
        .execute(&pool)
        .await
        .unwrap();

    let mut ids = Vec::new();
    for (name, role) in [("laboran", UserRole::Laboran), ("student", UserRole::Student)] {
        let user = services
            .users
            .create(&CreateUser {
                email: format!("{}-{}@lab.test", name, tag),
                full_name: name.to_string(),
                nim_nik: None,
                role: Some(role),
                phone: None,
            })
            .await
            .unwrap();
        services.users.verify(user.id, admin.id).await.unwrap();
        ids.push(user.id);
    }

    let lab = services
        .labs
        .create(
            admin.id,
            &CreateLab {
                name: "Biology".to_string(),
                code: format!("B{}", &tag[tag.len() - 8..]),
                description: String::new(),
                location: "Building C".to_string(),
                capacity: 30,
                operating_hours: "08:00-16:00".to_string(),
                contact_email: None,
                contact_phone: None,
            },
        )
        .await
        .unwrap();
    services.labs.add_member(admin.id, lab.id, ids[0], LabMemberRole::Laboran).await.unwrap();

    let category = services
        .categories
        .create(
            admin.id,
            &CreateCategory {
                name: "Optics".to_string(),
                description: String::new(),
                lab_id: Some(lab.id),
                parent_id: None,
            },
        )
        .await
        .unwrap();

    let equipment = services
        .equipment
        .create(
            admin.id,
            &CreateEquipment {
                name: "Microscope".to_string(),
                code: format!("MIC-{}", tag),
                category_id: category.id,
                lab_id: lab.id,
                description: String::new(),
                specifications: None,
                brand: None,
                model: None,
                serial_number: None,
                purchase_date: None,
                purchase_price: None,
                condition: None,
                needs_head_approval,
                quantity_total: Some(quantity),
                max_loan_duration_days: None,
                maintenance_interval_days: None,
            },
        )
        .await
        .unwrap();

    Fixture {
        services,
        laboran: ids[0],
        student: ids[1],
        equipment_id: equipment.id,
    }
}

fn loan_request(f: &Fixture, hours_from_now: i64) -> CreateLoan {
    let start = Utc::now() + Duration::hours(hours_from_now);
    CreateLoan {
        user_id: f.student,
        equipment_id: f.equipment_id,
        quantity: 1,
        start_datetime: start,
        end_datetime: start + Duration::hours(3),
        purpose: "practicum".to_string(),
        notes: None,
    }
}

#[tokio::test]
#[ignore]
async fn test_full_lifecycle() {
    let f = setup(1, false).await;
    let loans = &f.services.loans;

    // Starts a few minutes from now so checkout falls inside the tolerance
    let mut request = loan_request(&f, 0);
    request.start_datetime = Utc::now() + Duration::minutes(5);
    request.end_datetime = request.start_datetime + Duration::hours(2);
    let loan = loans.create_loan_request(request).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);

    let loan = loans
        .transition(loan.id, LoanEvent::Approve, Some(f.laboran), TransitionPayload::default())
        .await
        .unwrap();
    let loan = loans
        .transition(loan.id, LoanEvent::Checkout, Some(f.laboran), TransitionPayload::default())
        .await
        .unwrap();
    let status = f.services.equipment.get_equipment_status(f.equipment_id).await.unwrap();
    assert_eq!(status.status, EquipmentStatus::InUse);
    assert_eq!(status.quantity_available, 0);

    let loan = loans
        .transition(loan.id, LoanEvent::Checkin, Some(f.laboran), TransitionPayload::default())
        .await
        .unwrap();
    assert_eq!(loan.status, LoanStatus::CheckedIn);
    let status = f.services.equipment.get_equipment_status(f.equipment_id).await.unwrap();
    assert_eq!(status.status, EquipmentStatus::Available);
    assert_eq!(status.quantity_available, 1);

    let history = f.services.audit.list_for_entity("loan", loan.id).await.unwrap();
    assert_eq!(history.len(), 4);

    let inbox = f.services.notifications.list_for_user(f.student, true).await.unwrap();
    assert!(inbox.iter().any(|n| n.kind == NotificationType::EquipmentReturned));

    let staff_inbox = f.services.notifications.list_for_user(f.laboran, false).await.unwrap();
    assert!(staff_inbox
        .iter()
        .any(|n| n.kind == NotificationType::BorrowingRequest && n.related_id == Some(loan.id)));
}

#[tokio::test]
#[ignore]
async fn test_overlapping_request_conflicts() {
    let f = setup(1, false).await;
    let first = f.services.loans.create_loan_request(loan_request(&f, 24)).await.unwrap();

    let err = f.services.loans.create_loan_request(loan_request(&f, 25)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { ref loan_ids, .. } if loan_ids == &vec![first.id]));

    let start = first.start_datetime;
    let availability = f
        .services
        .loans
        .check_availability(f.equipment_id, start, start + Duration::hours(1), 1)
        .await
        .unwrap();
    assert!(!availability.is_available());

    f.services
        .loans
        .transition(first.id, LoanEvent::Cancel, Some(f.student), TransitionPayload::default())
        .await
        .unwrap();
    let availability = f
        .services
        .loans
        .check_availability(f.equipment_id, start, start + Duration::hours(1), 1)
        .await
        .unwrap();
    assert_eq!(availability, Availability::Available);

    let again = f
        .services
        .loans
        .transition(first.id, LoanEvent::Cancel, Some(f.student), TransitionPayload::default())
        .await;
    assert!(matches!(again, Err(AppError::InvalidTransition { .. })));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_requests_never_overcommit() {
    let f = setup(2, false).await;
    let mut handles = Vec::new();
    for _ in 0..6 {
        let loans = f.services.loans.clone();
        let request = loan_request(&f, 48);
        handles.push(tokio::spawn(async move { loans.create_loan_request(request).await }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict { .. }) => {}
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(created, 2);
}

#[tokio::test]
#[ignore]
async fn test_maintenance_takes_equipment_out_of_pool() {
    let f = setup(1, false).await;
    let record = f
        .services
        .maintenance
        .schedule(
            f.laboran,
            &lab_lending::models::maintenance::CreateMaintenance {
                equipment_id: f.equipment_id,
                maintenance_type: lab_lending::models::enums::MaintenanceType::Preventive,
                scheduled_date: Utc::now(),
                description: "lens cleaning".to_string(),
                performed_by: None,
                cost: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    f.services.maintenance.start(f.laboran, record.id).await.unwrap();
    let err = f.services.loans.create_loan_request(loan_request(&f, 2)).await.unwrap_err();
    assert!(matches!(err, AppError::EquipmentUnavailable(_)));

    f.services
        .maintenance
        .complete(f.laboran, record.id, Default::default())
        .await
        .unwrap();
    let equipment = f.services.equipment.get_by_id(f.equipment_id).await.unwrap();
    assert_eq!(equipment.status, EquipmentStatus::Available);
    assert!(equipment.next_maintenance_date.is_some());

    let again = f.services.maintenance.complete(f.laboran, record.id, Default::default()).await;
    assert!(matches!(again, Err(AppError::InvalidMaintenanceTransition { .. })));
}

#[tokio::test]
#[ignore]
async fn test_retired_equipment_stays_retired_after_maintenance() {
    let f = setup(1, false).await;
    f.services
        .equipment
        .set_status(f.laboran, f.equipment_id, EquipmentStatus::Retired)
        .await
        .unwrap();

    let schedule = |description: &str| lab_lending::models::maintenance::CreateMaintenance {
        equipment_id: f.equipment_id,
        maintenance_type: lab_lending::models::enums::MaintenanceType::Corrective,
        scheduled_date: Utc::now(),
        description: description.to_string(),
        performed_by: None,
        cost: None,
        notes: None,
    };

    let record = f.services.maintenance.schedule(f.laboran, &schedule("final check")).await.unwrap();
    let err = f.services.maintenance.start(f.laboran, record.id).await.unwrap_err();
    assert!(matches!(err, AppError::EquipmentUnavailable(_)));

    f.services
        .maintenance
        .complete(f.laboran, record.id, Default::default())
        .await
        .unwrap();
    let equipment = f.services.equipment.get_by_id(f.equipment_id).await.unwrap();
    assert_eq!(equipment.status, EquipmentStatus::Retired);

    let err = f.services.loans.create_loan_request(loan_request(&f, 2)).await.unwrap_err();
    assert!(matches!(err, AppError::EquipmentUnavailable(_)));
}

#[tokio::test]
#[ignore]
async fn test_check_availability_applies_request_rules() {
    let f = setup(1, false).await;
    let loans = &f.services.loans;

    let past = Utc::now() - Duration::days(3);
    let err = loans
        .check_availability(f.equipment_id, past, past + Duration::hours(1), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidWindow(_)));

    let start = Utc::now() + Duration::hours(1);
    let err = loans
        .check_availability(f.equipment_id, start, start + Duration::days(30), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DurationExceeded { .. }));

    f.services
        .equipment
        .set_status(f.laboran, f.equipment_id, EquipmentStatus::Damaged)
        .await
        .unwrap();
    let err = loans
        .check_availability(f.equipment_id, start, start + Duration::hours(2), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EquipmentUnavailable(_)));
}

#[tokio::test]
#[ignore]
async fn test_users_cannot_change_roles() {
    let f = setup(1, false).await;
    let users = &f.services.users;

    let promote = lab_lending::models::user::UpdateUser {
        role: Some(UserRole::Admin),
        ..Default::default()
    };
    let err = users.update(f.student, f.student, &promote).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = users.update(f.laboran, f.student, &promote).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(users.get_by_id(f.student).await.unwrap().role, UserRole::Student);

    let rename = lab_lending::models::user::UpdateUser {
        full_name: Some("Renamed Student".to_string()),
        ..Default::default()
    };
    let updated = users.update(f.student, f.student, &rename).await.unwrap();
    assert_eq!(updated.full_name, "Renamed Student");
}

#[tokio::test]
#[ignore]
async fn test_concurrent_category_moves_never_cycle() {
    let f = setup(1, false).await;
    let categories = f.services.categories.clone();

    let mut ids = Vec::new();
    for name in ["Lenses", "Filters"] {
        let category = categories
            .create(
                f.laboran,
                &CreateCategory {
                    name: name.to_string(),
                    description: String::new(),
                    lab_id: None,
                    parent_id: None,
                },
            )
            .await
            .unwrap();
        ids.push(category.id);
    }

    let (a, b) = (ids[0], ids[1]);
    let laboran = f.laboran;
    let first = {
        let categories = categories.clone();
        tokio::spawn(async move { categories.move_category(laboran, a, Some(b)).await })
    };
    let second = {
        let categories = categories.clone();
        tokio::spawn(async move { categories.move_category(laboran, b, Some(a)).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let moved = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(moved, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::Validation(_)))));
}

#[tokio::test]
#[ignore]
async fn test_usage_statistics_count_returned_loans() {
    let f = setup(1, false).await;
    let loans = &f.services.loans;
    let lab_id = f.services.equipment.get_by_id(f.equipment_id).await.unwrap().lab_id;

    let mut request = loan_request(&f, 0);
    request.start_datetime = Utc::now() + Duration::minutes(5);
    request.end_datetime = request.start_datetime + Duration::hours(2);
    let loan = loans.create_loan_request(request).await.unwrap();
    for event in [LoanEvent::Approve, LoanEvent::Checkout, LoanEvent::Checkin] {
        loans
            .transition(loan.id, event, Some(f.laboran), TransitionPayload::default())
            .await
            .unwrap();
    }
    // A request that never reaches checkout is not a borrowing
    loans.create_loan_request(loan_request(&f, 24)).await.unwrap();

    let range = StatsRange::new(Utc::now() - Duration::hours(1), Utc::now() + Duration::days(2)).unwrap();
    let usage = f.services.stats.equipment_usage(Some(range), Some(lab_id), 10).await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].equipment_id, f.equipment_id);
    assert_eq!(usage[0].total_borrowings, 1);
    assert_eq!(usage[0].damage_reports, 0);
    assert_eq!(usage[0].overdue_count, 0);

    let labs = f.services.stats.lab_usage(Some(range), Some(lab_id)).await.unwrap();
    assert_eq!(labs.len(), 1);
    assert_eq!(labs[0].total_equipment, 1);
    assert_eq!(labs[0].total_borrowings, 1);
    assert!((0.0..=1.0).contains(&labs[0].utilization_rate));
    assert_eq!(labs[0].average_booking_duration, 2.0);

    let periods = f.services.stats.by_period(Some(range), Interval::Month).await.unwrap();
    assert!(periods.iter().map(|p| p.total_borrowings).sum::<i64>() >= 1);
}
