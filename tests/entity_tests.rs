//! Entity mapping tests

use chrono::{NaiveDate, TimeZone, Utc};
use odata_entity_sdk::{
    Entity, EntityOptions, LinkKind, ODataError, PropertyValue, Schema, XmlWriterConfig,
};
use rust_decimal::Decimal;

const METADATA_V4: &str = include_str!("fixtures/metadata_v4.xml");
const METADATA_V2: &str = include_str!("fixtures/metadata_v2.xml");
const PRODUCT_XML: &str = include_str!("fixtures/product_0.xml");
const PRODUCT_JSON: &str = include_str!("fixtures/product_0.json");
const SUPPLIER_XML: &str = include_str!("fixtures/supplier_0.xml");
const SUPPLIER_JSON: &str = include_str!("fixtures/supplier_0.json");
const PRODUCT_V2_XML: &str = include_str!("fixtures/product_0_v2.xml");
const PRODUCT_V2_JSON: &str = include_str!("fixtures/product_0_v2.json");

fn v4_schema() -> Schema {
    Schema::from_csdl("ODataDemo", METADATA_V4).unwrap()
}

fn product_options() -> EntityOptions {
    EntityOptions::new("ODataDemo.Product", "ODataDemo")
}

fn supplier_options() -> EntityOptions {
    EntityOptions::new("ODataDemo.Supplier", "ODataDemo")
}

fn customer_options() -> EntityOptions {
    EntityOptions::new("ODataDemo.Customer", "ODataDemo")
}

fn person_detail_options() -> EntityOptions {
    EntityOptions::new("ODataDemo.PersonDetail", "ODataDemo")
}

const CUSTOMER_XML: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom"
    xmlns:d="http://docs.oasis-open.org/odata/ns/data"
    xmlns:m="http://docs.oasis-open.org/odata/ns/metadata">
  <content type="application/xml">
    <m:properties>
      <d:ID m:type="Edm.Int32">1</d:ID>
      <d:Name>Ann</d:Name>
      <d:TotalExpense m:type="Edm.Decimal">2.50</d:TotalExpense>
    </m:properties>
  </content>
</entry>"#;

const PERSON_DETAIL_XML: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom"
    xmlns:d="http://docs.oasis-open.org/odata/ns/data"
    xmlns:m="http://docs.oasis-open.org/odata/ns/metadata">
  <content type="image/jpeg" src="PersonDetails(1)/Photo"/>
  <m:properties>
    <d:PersonID m:type="Edm.Int32">1</d:PersonID>
    <d:Age m:type="Edm.Byte">24</d:Age>
    <d:Gender m:type="Edm.Boolean">false</d:Gender>
    <d:Phone>(505) 555-5939</d:Phone>
    <d:Photo m:type="Edm.Stream"/>
  </m:properties>
</entry>"#;

fn assert_valid_product(product: &Entity) {
    assert_eq!(product.name(), "Product");
    assert_eq!(product.type_name(), "ODataDemo.Product");
    assert_eq!(product.namespace(), "ODataDemo");
    assert_eq!(product.service_name(), "ODataDemo");
    assert_eq!(product.primary_key(), "ID");

    assert_eq!(product.property("ID").unwrap().type_name(), "Edm.Int32");
    assert_eq!(product.property("ReleaseDate").unwrap().type_name(), "Edm.DateTimeOffset");
    assert_eq!(product.property("Price").unwrap().type_name(), "Edm.Double");

    assert_eq!(product.get("ID").unwrap(), Some(&PropertyValue::Int32(0)));
    assert_eq!(product.get("Name").unwrap().and_then(PropertyValue::as_str), Some("Bread"));
    assert_eq!(
        product.get("Description").unwrap().and_then(PropertyValue::as_str),
        Some("Whole grain bread")
    );
    let released = Utc.with_ymd_and_hms(1992, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
        product.get("ReleaseDate").unwrap().and_then(PropertyValue::as_datetime_offset),
        Some(&released.fixed_offset())
    );
    assert_eq!(product.get("DiscontinuedDate").unwrap(), None);
    assert_eq!(product.get("Rating").unwrap().and_then(PropertyValue::as_i64), Some(4));
    assert_eq!(product.get("Price").unwrap().and_then(PropertyValue::as_f64), Some(2.5));

    assert!(matches!(product.get("NonExistent"), Err(ODataError::UnknownProperty(_))));
}

fn assert_valid_supplier(supplier: &Entity) {
    assert_eq!(supplier.name(), "Supplier");
    assert_eq!(supplier.type_name(), "ODataDemo.Supplier");
    assert_eq!(supplier.property("Address").unwrap().type_name(), "ODataDemo.Address");
    assert_eq!(supplier.property("Location").unwrap().type_name(), "Edm.GeographyPoint");

    assert_eq!(supplier.get("ID").unwrap(), Some(&PropertyValue::Int32(0)));
    assert_eq!(
        supplier.get("Name").unwrap().and_then(PropertyValue::as_str),
        Some("Exotic Liquids")
    );

    let address = supplier
        .get("Address")
        .unwrap()
        .and_then(PropertyValue::as_complex)
        .unwrap();
    let field = |name: &str| address.get(name).unwrap().and_then(PropertyValue::as_str);
    assert_eq!(field("Street"), Some("NE 228th"));
    assert_eq!(field("City"), Some("Sammamish"));
    assert_eq!(field("State"), Some("WA"));
    assert_eq!(field("ZipCode"), Some("98074"));
    assert_eq!(field("Country"), Some("USA"));

    let location = supplier
        .get("Location")
        .unwrap()
        .and_then(PropertyValue::as_point)
        .unwrap();
    assert!((location.latitude - 47.6316604614258).abs() < 1e-9);
    assert!((location.longitude + 122.03547668457).abs() < 1e-9);
    assert_eq!(location.srid, 4326);
}

mod direct_construction_tests {
    use super::*;

    #[test]
    fn test_with_properties() {
        let schema = v4_schema();
        let released = Utc.with_ymd_and_hms(1992, 1, 1, 0, 0, 0).unwrap();
        let product = Entity::with_properties(
            &schema,
            product_options(),
            [
                ("ID", Some(PropertyValue::from(0))),
                ("Name", Some(PropertyValue::from("Bread"))),
                ("Description", Some(PropertyValue::from("Whole grain bread"))),
                ("ReleaseDate", Some(PropertyValue::from(released))),
                ("DiscontinuedDate", None),
                ("Rating", Some(PropertyValue::from(4))),
                ("Price", Some(PropertyValue::from(2.5))),
            ],
        )
        .unwrap();

        assert_valid_product(&product);
        assert!(product.links().is_empty());
        assert_eq!(
            product.associations().names(),
            vec!["Categories", "Supplier", "ProductDetail"]
        );
    }

    #[test]
    fn test_wire_strings_are_coerced() {
        let schema = v4_schema();
        let product = Entity::with_properties(
            &schema,
            product_options(),
            [
                ("ID", Some(PropertyValue::from("0"))),
                ("Name", Some(PropertyValue::from("Bread"))),
                ("Description", Some(PropertyValue::from("Whole grain bread"))),
                ("ReleaseDate", Some(PropertyValue::from("1992-01-01T00:00:00Z"))),
                ("Rating", Some(PropertyValue::from("4"))),
                ("Price", Some(PropertyValue::from("2.5"))),
            ],
        )
        .unwrap();
        assert_valid_product(&product);
    }

    #[test]
    fn test_undeclared_property_is_rejected() {
        let schema = v4_schema();
        let result = Entity::with_properties(
            &schema,
            product_options(),
            [("NonExistent", Some(PropertyValue::from(5)))],
        );
        assert!(matches!(result, Err(ODataError::UnknownProperty(_))));

        let mut product = Entity::new(&schema, product_options()).unwrap();
        assert!(matches!(
            product.set("NonExistent", Some(PropertyValue::from(5))),
            Err(ODataError::UnknownProperty(_))
        ));
        assert_eq!(product.property_names().len(), 7);
    }

    #[test]
    fn test_coercion_failure() {
        let schema = v4_schema();
        let result = Entity::with_properties(
            &schema,
            product_options(),
            [("Rating", Some(PropertyValue::from("excellent")))],
        );
        assert!(matches!(result, Err(ODataError::TypeCoercion { .. })));
    }

    #[test]
    fn test_nested_complex_assignment() {
        let schema = v4_schema();
        let mut supplier = Entity::new(&schema, supplier_options()).unwrap();

        let address_type = supplier
            .property("Address")
            .unwrap()
            .kind()
            .complex_type()
            .cloned()
            .unwrap();
        let mut address = address_type.instantiate();
        address.set("City", Some("Sammamish".into())).unwrap();
        supplier.set("Address", Some(PropertyValue::Complex(address))).unwrap();

        let city = supplier
            .get("Address")
            .unwrap()
            .and_then(PropertyValue::as_complex)
            .and_then(|a| a.get("City").ok().flatten())
            .and_then(PropertyValue::as_str);
        assert_eq!(city, Some("Sammamish"));
        assert!(address_type.instantiate().get("City").unwrap().is_none());
    }
}

mod xml_tests {
    use super::*;

    #[test]
    fn test_decode_product() {
        let product = Entity::from_xml(&v4_schema(), product_options(), PRODUCT_XML).unwrap();
        assert_valid_product(&product);

        assert_eq!(product.links().len(), 3);
        let categories = product.link("Categories").unwrap();
        assert_eq!(categories.kind, LinkKind::Feed);
        assert_eq!(categories.href, "Products(0)/Categories");
        assert_eq!(product.link("Supplier").unwrap().kind, LinkKind::Entry);
    }

    #[test]
    fn test_decode_supplier() {
        let supplier = Entity::from_xml(&v4_schema(), supplier_options(), SUPPLIER_XML).unwrap();
        assert_valid_supplier(&supplier);
        assert_eq!(supplier.link("Products").unwrap().kind, LinkKind::Feed);
    }

    #[test]
    fn test_null_marker_wins_over_content() {
        let xml = PRODUCT_XML.replace(
            r#"<d:Rating m:type="Int16">4</d:Rating>"#,
            r#"<d:Rating m:type="Int16" m:null="true">4</d:Rating>"#,
        );
        let product = Entity::from_xml(&v4_schema(), product_options(), &xml).unwrap();
        assert_eq!(product.get("Rating").unwrap(), None);
    }

    #[test]
    fn test_v2_feed_aliases() {
        let schema = Schema::from_csdl("ODataDemo", METADATA_V2).unwrap();
        let product = Entity::from_xml(&schema, product_options(), PRODUCT_V2_XML).unwrap();

        assert_eq!(product.get("Name").unwrap().and_then(PropertyValue::as_str), Some("Bread"));
        assert_eq!(
            product.get("Description").unwrap().and_then(PropertyValue::as_str),
            Some("Whole grain bread")
        );
        let released = NaiveDate::from_ymd_opt(1992, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            product.get("ReleaseDate").unwrap().and_then(PropertyValue::as_datetime),
            Some(&released)
        );
        assert_eq!(
            product.get("Price").unwrap().and_then(PropertyValue::as_decimal),
            Some(&Decimal::new(25, 1))
        );
        assert_eq!(product.get("Price").unwrap().and_then(PropertyValue::as_str), None);
        assert_eq!(product.link("Category").unwrap().kind, LinkKind::Entry);
    }

    #[test]
    fn test_encode_omits_primary_key() {
        let product = Entity::from_xml(&v4_schema(), product_options(), PRODUCT_XML).unwrap();
        let xml = product.to_xml().unwrap();

        assert!(xml.contains(r#"<category term="ODataDemo.Product""#));
        assert!(xml.contains(r#"<data:Name metadata:type="Edm.String">Bread</data:Name>"#));
        assert!(xml.contains(
            r#"<data:ReleaseDate metadata:type="Edm.DateTimeOffset">1992-01-01T00:00:00Z</data:ReleaseDate>"#
        ));
        assert!(xml.contains(
            r#"<data:DiscontinuedDate metadata:type="Edm.DateTimeOffset" metadata:null="true"/>"#
        ));
        assert!(xml.contains(r#"<data:Price metadata:type="Edm.Double">2.5</data:Price>"#));
        assert!(!xml.contains("<data:ID"));

        let name = xml.find("data:Name").unwrap();
        let rating = xml.find("data:Rating").unwrap();
        let price = xml.find("data:Price").unwrap();
        assert!(name < rating && rating < price);
    }

    #[test]
    fn test_encode_with_v4_namespaces() {
        let product = Entity::from_xml(&v4_schema(), product_options(), PRODUCT_XML).unwrap();
        let xml = product.to_xml_with(&XmlWriterConfig::v4()).unwrap();
        assert!(xml.contains(r#"xmlns:data="http://docs.oasis-open.org/odata/ns/data""#));
        assert!(xml.contains(r#"scheme="http://docs.oasis-open.org/odata/ns/scheme""#));
    }

    #[test]
    fn test_round_trip_reproduces_values_except_key() {
        let schema = v4_schema();
        let supplier = Entity::from_xml(&schema, supplier_options(), SUPPLIER_XML).unwrap();
        let decoded =
            Entity::from_xml(&schema, supplier_options(), &supplier.to_xml().unwrap()).unwrap();

        assert_eq!(decoded.get("ID").unwrap(), None);
        for name in ["Name", "Address", "Location", "Concurrency"] {
            assert_eq!(decoded.get(name).unwrap(), supplier.get(name).unwrap(), "{}", name);
        }
    }
}

mod json_tests {
    use super::*;

    #[test]
    fn test_decode_product() {
        let product = Entity::from_json(&v4_schema(), product_options(), PRODUCT_JSON).unwrap();
        assert_valid_product(&product);
        assert_eq!(product.link("Categories").unwrap().kind, LinkKind::Feed);
        assert_eq!(product.link("ProductDetail").unwrap().href, "Products(0)/ProductDetail");
    }

    #[test]
    fn test_decode_supplier() {
        let supplier = Entity::from_json(&v4_schema(), supplier_options(), SUPPLIER_JSON).unwrap();
        assert_valid_supplier(&supplier);
    }

    #[test]
    fn test_encode_includes_primary_key() {
        let product = Entity::from_json(&v4_schema(), product_options(), PRODUCT_JSON).unwrap();
        let json = product.to_json();

        assert_eq!(json["ID"], 0);
        assert_eq!(json["Name"], "Bread");
        assert_eq!(json["ReleaseDate"], "1992-01-01T00:00:00Z");
        assert!(json["DiscontinuedDate"].is_null());
        assert_eq!(json["Price"], 2.5);

        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec!["ID", "Name", "Description", "ReleaseDate", "DiscontinuedDate", "Rating", "Price"]
        );
    }

    #[test]
    fn test_encode_nested_complex_value() {
        let supplier = Entity::from_json(&v4_schema(), supplier_options(), SUPPLIER_JSON).unwrap();
        let json = supplier.to_json();
        assert_eq!(json["Address"]["City"], "Sammamish");
        assert_eq!(json["Location"]["type"], "Point");
    }
}

mod cross_format_tests {
    use super::*;

    #[test]
    fn test_xml_and_json_decode_identically() {
        let schema = v4_schema();
        let from_xml = Entity::from_xml(&schema, product_options(), PRODUCT_XML).unwrap();
        let from_json = Entity::from_json(&schema, product_options(), PRODUCT_JSON).unwrap();
        assert_eq!(from_xml.properties(), from_json.properties());
        assert_eq!(from_xml.links(), from_json.links());
    }

    #[test]
    fn test_supplier_formats_agree() {
        let schema = v4_schema();
        let from_xml = Entity::from_xml(&schema, supplier_options(), SUPPLIER_XML).unwrap();
        let from_json = Entity::from_json(&schema, supplier_options(), SUPPLIER_JSON).unwrap();
        for name in ["ID", "Name", "Address", "Concurrency"] {
            assert_eq!(from_xml.get(name).unwrap(), from_json.get(name).unwrap(), "{}", name);
        }
    }

    #[test]
    fn test_v2_formats_agree() {
        let schema = Schema::from_csdl("ODataDemo", METADATA_V2).unwrap();
        let from_xml = Entity::from_xml(&schema, product_options(), PRODUCT_V2_XML).unwrap();
        let from_json = Entity::from_json(&schema, product_options(), PRODUCT_V2_JSON).unwrap();
        assert_eq!(from_xml.properties(), from_json.properties());
        assert_eq!(from_xml.links().len(), 2);
        assert_eq!(from_json.links().len(), 2);
        assert_eq!(
            from_json.link("Supplier").unwrap().href,
            "http://services.odata.org/OData/OData.svc/Products(0)/Supplier"
        );
    }

    #[test]
    fn test_json_output_decodes_back() {
        let schema = v4_schema();
        let product = Entity::from_xml(&schema, product_options(), PRODUCT_XML).unwrap();
        let decoded =
            Entity::from_json(&schema, product_options(), &product.to_json_string().unwrap())
                .unwrap();
        assert_eq!(decoded.properties(), product.properties());
    }

    #[test]
    fn test_decimal_formats_agree() {
        let schema = v4_schema();
        let from_xml = Entity::from_xml(&schema, customer_options(), CUSTOMER_XML).unwrap();
        let from_json = Entity::from_json(
            &schema,
            customer_options(),
            r#"{"ID": 1, "Name": "Ann", "TotalExpense": 2.50}"#,
        )
        .unwrap();
        assert_eq!(from_xml.properties(), from_json.properties());
        assert_eq!(
            from_json.get("TotalExpense").unwrap().and_then(PropertyValue::as_decimal),
            Some(&Decimal::new(25, 1))
        );
        assert_eq!(from_json.to_json()["TotalExpense"], 2.5);
    }

    #[test]
    fn test_decimal_keeps_every_digit() {
        let schema = v4_schema();
        let customer = Entity::from_json(
            &schema,
            customer_options(),
            r#"{"ID": 1, "TotalExpense": "12345678901234567890.123456789"}"#,
        )
        .unwrap();
        assert_eq!(customer.to_json()["TotalExpense"], "12345678901234567890.123456789");
        assert!(customer.to_xml().unwrap().contains(
            r#"<data:TotalExpense metadata:type="Edm.Decimal">12345678901234567890.123456789</data:TotalExpense>"#
        ));

        let decoded =
            Entity::from_json(&schema, customer_options(), &customer.to_json_string().unwrap())
                .unwrap();
        assert_eq!(decoded.properties(), customer.properties());
        let reparsed = Entity::from_xml(&schema, customer_options(), &customer.to_xml().unwrap()).unwrap();
        assert_eq!(reparsed.get("TotalExpense").unwrap(), customer.get("TotalExpense").unwrap());
    }

    #[test]
    fn test_stream_properties_stay_out_of_payloads() {
        let schema = v4_schema();
        let from_xml = Entity::from_xml(&schema, person_detail_options(), PERSON_DETAIL_XML).unwrap();
        let from_json = Entity::from_json(
            &schema,
            person_detail_options(),
            r#"{
                "PersonID": 1,
                "Age": 24,
                "Gender": false,
                "Phone": "(505) 555-5939",
                "Photo@odata.mediaReadLink": "PersonDetails(1)/Photo"
            }"#,
        )
        .unwrap();
        assert_eq!(from_xml.properties(), from_json.properties());
        assert_eq!(from_xml.get("Age").unwrap(), Some(&PropertyValue::Byte(24)));
        assert_eq!(from_xml.get("Photo").unwrap(), None);

        let json = from_xml.to_json();
        assert!(json.get("Photo").is_none());
        assert_eq!(json["Phone"], "(505) 555-5939");
        assert!(!from_xml.to_xml().unwrap().contains("Photo"));
    }
}
