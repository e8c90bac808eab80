use super::common::*;

use crate::marketplace::domain::{
    AccountId, CompanyId, EquipmentOwner, JobId, JobStatus, Role, SkillType, Urgency,
};
use crate::marketplace::listings::{
    EquipmentFilter, EquipmentListings, EquipmentSort, JobFilter, JobListing, JobSort, Jobs,
    ListingRepository, ListingType, OwnerCard, ProfessionalFilter, ProfessionalSort,
    Professionals, Reputation, ReputationTarget,
};
use crate::marketplace::workflow::JobBoardStore;
use crate::marketplace::MarketplaceError;

fn post(harness: &Harness, company_id: &CompanyId, title: &str, urgency: Urgency) -> JobListing {
    let mut draft = job_draft(title, urgency, "Austin", "TX");
    draft.company_id = Some(company_id.clone());
    let listing = ListingRepository::<Jobs>::create(harness.repository(), draft)
        .expect("job is created");
    harness.tick();
    listing
}

fn job_ids(listings: &[JobListing]) -> Vec<JobId> {
    listings.iter().map(|listing| listing.job.id.clone()).collect()
}

#[test]
fn default_job_feed_shows_open_jobs_by_priority() {
    let harness = Harness::new();
    let (_, company) = harness.company("Apex Tree Solutions", "ops@apextree.com");

    let j1 = post(&harness, &company, "Crown reduction", Urgency::Urgent);
    let j2 = post(&harness, &company, "Storm cleanup", Urgency::Emergency);
    let j3 = post(&harness, &company, "Hedge trimming", Urgency::Normal);
    harness
        .repository()
        .set_job_status(&j3.job.id, JobStatus::Open, JobStatus::InProgress)
        .expect("status update");
    harness
        .repository()
        .set_job_status(&j3.job.id, JobStatus::InProgress, JobStatus::Completed)
        .expect("status update");

    let listings = ListingRepository::<Jobs>::list(
        harness.repository(),
        &JobFilter::default(),
        JobSort::default(),
    )
    .expect("listing works");
    assert_eq!(job_ids(&listings), vec![j2.job.id, j1.job.id]);
    assert_eq!(listings[0].company.profile.id, company);
    assert_eq!(listings[0].company.user.email, "ops@apextree.com");
    assert_eq!(listings[0].applicant_count, 0);
}

#[test]
fn urgency_ties_break_on_newest_posting() {
    let harness = Harness::new();
    let (_, company) = harness.company("Metro Tree Service", "info@metrotree.com");

    let normal = post(&harness, &company, "Mulching", Urgency::Normal);
    let first_emergency = post(&harness, &company, "Downed oak", Urgency::Emergency);
    let urgent = post(&harness, &company, "Leaning pine", Urgency::Urgent);
    let second_emergency = post(&harness, &company, "Roof strike", Urgency::Emergency);

    let by_priority = ListingRepository::<Jobs>::list(
        harness.repository(),
        &JobFilter::default(),
        JobSort::Priority,
    )
    .expect("listing works");
    assert_eq!(
        job_ids(&by_priority),
        vec![
            second_emergency.job.id.clone(),
            first_emergency.job.id.clone(),
            urgent.job.id.clone(),
            normal.job.id.clone(),
        ]
    );

    let by_date = ListingRepository::<Jobs>::list(
        harness.repository(),
        &JobFilter::default(),
        JobSort::Newest,
    )
    .expect("listing works");
    assert_eq!(
        job_ids(&by_date),
        vec![
            second_emergency.job.id,
            urgent.job.id,
            first_emergency.job.id,
            normal.job.id,
        ]
    );
    for pair in by_date.windows(2) {
        assert!(pair[0].job.posted_at > pair[1].job.posted_at);
    }
}

#[test]
fn job_filters_are_idempotent_and_conjunctive() {
    let harness = Harness::new();
    let (_, company) = harness.company("GreenLeaf Arbor Care", "hello@greenleaf.com");

    post(&harness, &company, "Austin removal", Urgency::Normal);
    let mut denver = job_draft("Denver climb", Urgency::Urgent, "Denver", "CO");
    denver.company_id = Some(company.clone());
    denver.skills_required = vec![SkillType::CraneOperator];
    ListingRepository::<Jobs>::create(harness.repository(), denver).expect("job is created");

    let filter = JobFilter {
        location: Some("tx".to_string()),
        skills: vec![SkillType::Climber, SkillType::CraneOperator],
        ..JobFilter::default()
    };
    let once = ListingRepository::<Jobs>::list(harness.repository(), &filter, JobSort::Priority)
        .expect("listing works");
    let twice = ListingRepository::<Jobs>::list(harness.repository(), &filter, JobSort::Priority)
        .expect("listing works");
    assert_eq!(job_ids(&once), job_ids(&twice));
    assert_eq!(once.len(), 1);
    assert_eq!(once[0].job.city, "Austin");

    let crane_only = JobFilter {
        skills: vec![SkillType::CraneOperator],
        urgency: vec![Urgency::Urgent, Urgency::Emergency],
        ..JobFilter::default()
    };
    let listings =
        ListingRepository::<Jobs>::list(harness.repository(), &crane_only, JobSort::Priority)
            .expect("listing works");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].job.city, "Denver");

    let nowhere = JobFilter {
        location: Some("Boise".to_string()),
        ..JobFilter::default()
    };
    assert!(
        ListingRepository::<Jobs>::list(harness.repository(), &nowhere, JobSort::Priority)
            .expect("empty listing is fine")
            .is_empty()
    );
}

#[test]
fn text_filters_ignore_case_beyond_ascii() {
    let harness = Harness::new();
    let (_, company) = harness.company("Élagage Évry", "contact@elagage-evry.fr");
    let (_, professional_id) = harness.professional("Sam Climber", "sam@example.com");

    let mut evry = job_draft("Abattage", Urgency::Normal, "Évry", "Île-de-France");
    evry.company_id = Some(company.clone());
    let evry = ListingRepository::<Jobs>::create(harness.repository(), evry)
        .expect("job is created");
    post(&harness, &company, "Austin removal", Urgency::Normal);

    for needle in ["évry", "ÉVRY", "île-de"] {
        let filter = JobFilter {
            location: Some(needle.to_string()),
            ..JobFilter::default()
        };
        let listings =
            ListingRepository::<Jobs>::list(harness.repository(), &filter, JobSort::Priority)
                .expect("listing works");
        assert_eq!(job_ids(&listings), vec![evry.job.id.clone()], "location {needle}");
    }

    let mut saw = equipment_draft("Scie Électrique", true, false);
    saw.owner = Some(EquipmentOwner::Professional(professional_id));
    let saw = ListingRepository::<EquipmentListings>::create(harness.repository(), saw)
        .expect("equipment created");
    let found = ListingRepository::<EquipmentListings>::list(
        harness.repository(),
        &EquipmentFilter {
            search: Some("électrique".to_string()),
            ..EquipmentFilter::default()
        },
        EquipmentSort::default(),
    )
    .expect("listing works");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].equipment.id, saw.equipment.id);
}

#[test]
fn job_creation_validates_and_keeps_absent_amounts_null() {
    let harness = Harness::new();
    let (_, company) = harness.company("Apex Tree Solutions", "ops@apextree.com");

    let listing = post(&harness, &company, "Crown cleaning", Urgency::Low);
    assert_eq!(listing.job.status, JobStatus::Open);
    assert_eq!(listing.job.pay_amount, 45.0);
    assert_eq!(listing.job.overtime_rate, None);
    assert_eq!(listing.job.gate_width, None);

    let fetched = ListingRepository::<Jobs>::get_by_id(harness.repository(), &listing.job.id)
        .expect("job exists");
    assert_eq!(fetched.job, listing.job);

    let mut negative = job_draft("Negative pay", Urgency::Normal, "Austin", "TX");
    negative.company_id = Some(company.clone());
    negative.pay_amount = Some("-10".into());
    assert!(matches!(
        ListingRepository::<Jobs>::create(harness.repository(), negative),
        Err(MarketplaceError::Validation(_))
    ));

    let mut orphan = job_draft("Orphan", Urgency::Normal, "Austin", "TX");
    orphan.company_id = Some(CompanyId::from("missing-company"));
    assert!(matches!(
        ListingRepository::<Jobs>::create(harness.repository(), orphan),
        Err(MarketplaceError::NotFound { kind: "company", .. })
    ));

    assert!(matches!(
        ListingRepository::<Jobs>::get_by_id(harness.repository(), &JobId::from("nope")),
        Err(MarketplaceError::NotFound { kind: "job", .. })
    ));
}

#[test]
fn verified_professionals_rank_above_higher_ratings() {
    let harness = Harness::new();
    let (_, a) = harness.professional("Alex Verified", "alex@example.com");
    let (_, b) = harness.professional("Blair Unverified", "blair@example.com");

    harness
        .repository()
        .record_reputation(
            &ReputationTarget::Professional(a.clone()),
            Reputation {
                rating: 4.0,
                total_jobs: 12,
                verified: true,
            },
        )
        .expect("reputation recorded");
    harness
        .repository()
        .record_reputation(
            &ReputationTarget::Professional(b.clone()),
            Reputation {
                rating: 5.0,
                total_jobs: 3,
                verified: false,
            },
        )
        .expect("reputation recorded");

    let ranked = ListingRepository::<Professionals>::list(
        harness.repository(),
        &ProfessionalFilter::default(),
        ProfessionalSort::default(),
    )
    .expect("listing works");
    let ids: Vec<_> = ranked.iter().map(|listing| listing.profile.id.clone()).collect();
    assert_eq!(ids, vec![a.clone(), b.clone()]);
    assert!(ranked[0].user.verified, "verification mirrors onto the account");

    let by_rating = ListingRepository::<Professionals>::list(
        harness.repository(),
        &ProfessionalFilter::default(),
        ProfessionalSort::Rating,
    )
    .expect("listing works");
    let ids: Vec<_> = by_rating.iter().map(|listing| listing.profile.id.clone()).collect();
    assert_eq!(ids, vec![b, a.clone()]);

    let verified_only = ListingRepository::<Professionals>::list(
        harness.repository(),
        &ProfessionalFilter {
            verified_only: true,
            ..ProfessionalFilter::default()
        },
        ProfessionalSort::Ranked,
    )
    .expect("listing works");
    assert_eq!(verified_only.len(), 1);
    assert_eq!(verified_only[0].profile.id, a);

    assert!(matches!(
        harness.repository().record_reputation(
            &ReputationTarget::Professional(verified_only[0].profile.id.clone()),
            Reputation {
                rating: 7.5,
                total_jobs: 0,
                verified: true,
            },
        ),
        Err(MarketplaceError::Validation(_))
    ));
}

#[test]
fn professional_profiles_are_one_per_professional_account() {
    let harness = Harness::new();
    let (_, professional_id) = harness.professional("Sam Climber", "sam@example.com");
    let account = harness
        .marketplace
        .identity
        .authenticate("sam@example.com", PASSWORD)
        .expect("login")
        .account_id;

    let mut draft = professional_draft();
    draft.account_id = Some(account.clone());
    assert!(matches!(
        ListingRepository::<Professionals>::create(harness.repository(), draft),
        Err(MarketplaceError::Conflict(_))
    ));

    let homeowner = harness.sign_up("Pat Homeowner", "pat@example.com", Role::Homeowner);
    let mut draft = professional_draft();
    draft.account_id = Some(homeowner.id);
    assert!(matches!(
        ListingRepository::<Professionals>::create(harness.repository(), draft),
        Err(MarketplaceError::Validation(_))
    ));

    let mut draft = professional_draft();
    draft.account_id = Some(AccountId::from("ghost"));
    assert!(matches!(
        ListingRepository::<Professionals>::create(harness.repository(), draft),
        Err(MarketplaceError::NotFound { .. })
    ));

    let mut draft = professional_draft();
    draft.account_id = Some(account.clone());
    let updated = harness
        .repository()
        .update_professional(&professional_id, draft)
        .expect("profile updated");
    assert_eq!(updated.profile.account_id, account);
    assert_eq!(updated.profile.hourly_rate, Some(52.5));
    assert_eq!(updated.skills.len(), 2);
    assert_eq!(updated.certifications.len(), 1);
    assert_eq!(updated.profile.rating, 0.0);
}

#[test]
fn equipment_for_sale_and_rent_appears_in_both_views() {
    let harness = Harness::new();
    let (_, professional_id) = harness.professional("Sam Climber", "sam@example.com");
    let owner = EquipmentOwner::Professional(professional_id.clone());

    let mut both = equipment_draft("Stihl MS 661", true, true);
    both.owner = Some(owner.clone());
    let both = ListingRepository::<EquipmentListings>::create(harness.repository(), both)
        .expect("equipment created");
    harness.tick();

    let mut sale_only = equipment_draft("Husqvarna 572", true, false);
    sale_only.owner = Some(owner.clone());
    let sale_only =
        ListingRepository::<EquipmentListings>::create(harness.repository(), sale_only)
            .expect("equipment created");

    let view = |listing_type| {
        ListingRepository::<EquipmentListings>::list(
            harness.repository(),
            &EquipmentFilter {
                listing_type: Some(listing_type),
                ..EquipmentFilter::default()
            },
            EquipmentSort::default(),
        )
        .expect("listing works")
        .into_iter()
        .map(|listing| listing.equipment.id)
        .collect::<Vec<_>>()
    };

    assert_eq!(
        view(ListingType::Sale),
        vec![sale_only.equipment.id.clone(), both.equipment.id.clone()]
    );
    assert_eq!(view(ListingType::Rent), vec![both.equipment.id.clone()]);

    match &both.owner_profile {
        OwnerCard::Professional(card) => {
            assert_eq!(card.profile.id, professional_id);
            assert_eq!(card.user.email, "sam@example.com");
        }
        other => panic!("expected professional owner, got {other:?}"),
    }
    assert_eq!(both.equipment.price, Some(1299.99));
    assert_eq!(sale_only.equipment.daily_rental_rate, None);

    let by_price = ListingRepository::<EquipmentListings>::list(
        harness.repository(),
        &EquipmentFilter {
            search: Some("husq".to_string()),
            ..EquipmentFilter::default()
        },
        EquipmentSort::PriceAscending,
    )
    .expect("listing works");
    assert_eq!(by_price.len(), 1);
    assert_eq!(by_price[0].equipment.id, sale_only.equipment.id);
}

#[test]
fn equipment_requires_an_existing_owner_and_a_listing_type() {
    let harness = Harness::new();
    let (_, company) = harness.company("Metro Tree Service", "info@metrotree.com");

    let mut company_owned = equipment_draft("Bandit BC-600", false, true);
    company_owned.owner = Some(EquipmentOwner::Company(company.clone()));
    let listing = ListingRepository::<EquipmentListings>::create(harness.repository(), company_owned)
        .expect("equipment created");
    assert!(matches!(listing.owner_profile, OwnerCard::Company(ref card) if card.profile.id == company));

    let mut ghost = equipment_draft("Ghost saw", true, false);
    ghost.owner = Some(EquipmentOwner::Company(CompanyId::from("ghost")));
    assert!(matches!(
        ListingRepository::<EquipmentListings>::create(harness.repository(), ghost),
        Err(MarketplaceError::NotFound { .. })
    ));

    let mut neither = equipment_draft("Idle chipper", false, false);
    neither.owner = Some(EquipmentOwner::Company(company));
    assert!(matches!(
        ListingRepository::<EquipmentListings>::create(harness.repository(), neither),
        Err(MarketplaceError::Validation(_))
    ));
}
