// Esquema Diesel del registro (SQLite).
// Tablas: users, workgroups, boreholes, workflows, stratigraphies, layers
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    users (id) {
        id -> Integer,
        subject_id -> Text,
        first_name -> Text,
        last_name -> Text,
        name -> Text,
    }
}
diesel::table! {
    workgroups (id) {
        id -> Integer,
        name -> Text,
    }
}
diesel::table! {
    boreholes (id) {
        id -> Integer,
        name -> Nullable<Text>,
        workgroup_id -> Nullable<Integer>,
        created_by_id -> Nullable<Integer>,
        updated_by_id -> Nullable<Integer>,
        total_depth -> Nullable<Double>,
        location_x -> Nullable<Double>,
        location_y -> Nullable<Double>,
        location_x_lv03 -> Nullable<Double>,
        location_y_lv03 -> Nullable<Double>,
    }
}
diesel::table! {
    workflows (id) {
        id -> Integer,
        borehole_id -> Integer,
        user_id -> Nullable<Integer>,
        role -> Integer,
        started_at_ts -> Nullable<BigInt>,
        finished_at_ts -> Nullable<BigInt>,
    }
}
diesel::table! {
    stratigraphies (id) {
        id -> Integer,
        borehole_id -> Integer,
        name -> Nullable<Text>,
        is_primary -> Bool,
    }
}
diesel::table! {
    layers (id) {
        id -> Integer,
        stratigraphy_id -> Integer,
        from_depth -> Nullable<Double>,
        to_depth -> Nullable<Double>,
        description -> Nullable<Text>,
    }
}
allow_tables_to_appear_in_same_query!(users, workgroups, boreholes, workflows, stratigraphies, layers);
