//! GraphQL documents sent to the portal.

pub(crate) const LOGIN: &str = "\
mutation signinUser($username: String!, $password: String!) {
  login(username: $username, password: $password)
}";

pub(crate) const PROBE: &str = "\
query {
  getGUI {
    user {
      id
      username
      fullname
      email
    }
  }
}";

pub(crate) const GET_PAGE: &str = "\
query getPage($name: String!, $params: [PageParam!]) {
  getPage(name: $name, params: $params) {
    name
    title
    scope { name type value array { name value array { name value } } }
    panels {
      name
      scope { name type value array { name value array { name value } } }
      blocks {
        name
        type
        title
        body
        config {
          name
          type
          value
          array { name value array { name value array { name value } } }
        }
        childs {
          name
          type
          title
          body
          config {
            name
            type
            value
            array { name value array { name value array { name value } } }
          }
        }
      }
    }
  }
}";
