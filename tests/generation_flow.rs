//! End-to-end generation over small pools

use asngen::{Item, MatchEngine, standard_rules};

fn nircam_image(expname: &str, target: &str) -> Item {
    Item::builder()
        .attr("expname", expname)
        .attr("instrume", "nircam")
        .attr("exp_type", "nrc_image")
        .attr("detector", "nrca1")
        .attr("targetid", target)
        .attr("asn_candidate", "o001")
        .attr("asn_pool", "pool_001")
        .build()
}

fn niriss(expname: &str, exp_type: &str) -> Item {
    Item::builder()
        .attr("expname", expname)
        .attr("instrume", "niriss")
        .attr("exp_type", exp_type)
        .attr("targetid", "7")
        .attr("asn_candidate", "o002")
        .attr("asn_pool", "pool_001")
        .build()
}

fn slit_nod(expname: &str, patt_num: &str) -> Item {
    Item::builder()
        .attr("expname", expname)
        .attr("instrume", "nirspec")
        .attr("exp_type", "nrs_fixedslit")
        .attr("patttype", "2-point-nod")
        .attr("patt_num", patt_num)
        .attr("targetid", "3")
        .attr("asn_candidate", "o003")
        .attr("asn_pool", "pool_001")
        .build()
}

fn engine() -> MatchEngine {
    MatchEngine::new(standard_rules().unwrap())
}

#[test]
fn test_science_and_background_group_together() {
    let science = nircam_image("jw001_sci_rate.fits", "1");
    let background = Item::builder()
        .attr("expname", "jw001_bkg_rate.fits")
        .attr("instrume", "nircam")
        .attr("exp_type", "nrc_image")
        .attr("detector", "nrca1")
        .attr("targetid", "1")
        .attr("bkgdtarg", "t")
        .attr("asn_candidate", "o001")
        .attr("asn_pool", "pool_001")
        .build();

    let docs = engine().generate(&[science, background]).unwrap();
    assert_eq!(docs.len(), 1);

    let members = &docs[0].products[0].members;
    assert_eq!(members.len(), 2);
    assert!(members.iter().any(|m| m.exptype == "science"));
    assert!(members.iter().any(|m| m.exptype == "background"));
}

#[test]
fn test_direct_image_joins_grism_association_after_reprocessing() {
    // The direct image arrives first; only reprocessing can place it in
    // the dispersed association that forms later.
    let pool = vec![
        niriss("jw002_direct_rate.fits", "nis_image"),
        niriss("jw002_grism_rate.fits", "nis_wfss"),
    ];

    let docs = engine().generate(&pool).unwrap();
    let wfss = docs
        .iter()
        .find(|d| d.asn_rule == "wfss")
        .expect("dispersed association");

    let members = &wfss.products[0].members;
    assert_eq!(members.len(), 2);
    assert!(members
        .iter()
        .any(|m| m.expname == "jw002_grism_rate.fits" && m.exptype == "science"));
    assert!(members
        .iter()
        .any(|m| m.expname == "jw002_direct_rate.fits" && m.exptype == "direct_image"));

    // The direct image also gets its own imaging association.
    assert!(docs
        .iter()
        .any(|d| d.asn_rule == "image"
            && d.products[0].members[0].expname == "jw002_direct_rate.fits"));
}

#[test]
fn test_nod_positions_split_science_and_background() {
    let pool = vec![slit_nod("jw003_nod1_rate.fits", "1"), slit_nod("jw003_nod2_rate.fits", "2")];

    let docs = engine().generate(&pool).unwrap();
    let nod = docs
        .iter()
        .find(|d| d.asn_rule == "slit-nod")
        .expect("nod association");

    let members = &nod.products[0].members;
    assert_eq!(members.len(), 2);
    let science: Vec<_> = members.iter().filter(|m| m.exptype == "science").collect();
    let background: Vec<_> = members.iter().filter(|m| m.exptype == "background").collect();
    assert_eq!(science.len(), 1);
    assert_eq!(background.len(), 1);
    assert_eq!(science[0].expname, "jw003_nod1_rate.fits");
}

#[test]
fn test_duplicate_nod_position_is_kept_out() {
    let pool = vec![
        slit_nod("jw003_nod1_rate.fits", "1"),
        slit_nod("jw003_dup_rate.fits", "1"),
        slit_nod("jw003_nod2_rate.fits", "2"),
    ];

    let docs = engine().generate(&pool).unwrap();
    let nod = docs.iter().find(|d| d.asn_rule == "slit-nod").unwrap();
    let names: Vec<_> = nod.products[0]
        .members
        .iter()
        .map(|m| m.expname.as_str())
        .collect();
    assert!(names.contains(&"jw003_nod1_rate.fits"));
    assert!(names.contains(&"jw003_nod2_rate.fits"));
    assert!(!names.contains(&"jw003_dup_rate.fits"));
}

#[test]
fn test_result_is_independent_of_pool_order() {
    let pool = vec![
        nircam_image("jw001_a_rate.fits", "1"),
        nircam_image("jw001_b_rate.fits", "1"),
        niriss("jw002_direct_rate.fits", "nis_image"),
        niriss("jw002_grism_rate.fits", "nis_wfss"),
    ];
    let mut reversed = pool.clone();
    reversed.reverse();

    let forward = engine().generate(&pool).unwrap();
    let backward = engine().generate(&reversed).unwrap();

    // Same associations with the same membership, regardless of arrival
    // order. Member order within a product may differ.
    assert_eq!(forward.len(), backward.len());
    for (a, b) in forward.iter().zip(&backward) {
        assert_eq!(a.asn_rule, b.asn_rule);
        assert_eq!(a.asn_id, b.asn_id);

        let mut a_members: Vec<_> = a.products[0]
            .members
            .iter()
            .map(|m| (m.expname.clone(), m.exptype.clone()))
            .collect();
        let mut b_members: Vec<_> = b.products[0]
            .members
            .iter()
            .map(|m| (m.expname.clone(), m.exptype.clone()))
            .collect();
        a_members.sort();
        b_members.sort();
        assert_eq!(a_members, b_members);
    }
}

#[test]
fn test_documents_are_ordered_by_candidate() {
    let late = Item::builder()
        .attr("expname", "jw001_z_rate.fits")
        .attr("instrume", "nircam")
        .attr("exp_type", "nrc_image")
        .attr("targetid", "9")
        .attr("asn_candidate", "o005")
        .attr("asn_pool", "pool_001")
        .build();

    let docs = engine()
        .generate(&[late, nircam_image("jw001_a_rate.fits", "1")])
        .unwrap();
    let ids: Vec<_> = docs.iter().map(|d| d.asn_id.as_str()).collect();
    assert_eq!(ids, vec!["o001", "o005"]);
}
