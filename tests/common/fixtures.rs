//! Source files in every supported dialect.

pub const SELENIUM_JAVA_LOGIN: &str = r#"import org.junit.jupiter.api.*;
import org.openqa.selenium.By;
import org.openqa.selenium.WebDriver;
import org.openqa.selenium.WebElement;
import org.openqa.selenium.chrome.ChromeDriver;
import org.openqa.selenium.support.ui.ExpectedConditions;
import org.openqa.selenium.support.ui.WebDriverWait;
import java.time.Duration;

public class LoginTest {
    private WebDriver driver;

    @BeforeEach
    public void setUp() {
        driver = new ChromeDriver();
        driver.get("https://example.com/login");
    }

    @AfterEach
    public void tearDown() {
        driver.quit();
    }

    @Test
    public void shouldLoginSuccessfully() {
        WebDriverWait wait = new WebDriverWait(driver, Duration.ofSeconds(10));
        WebElement username = wait.until(ExpectedConditions.visibilityOfElementLocated(By.id("username")));
        username.sendKeys("alice");
        driver.findElement(By.id("password")).sendKeys("secret");
        driver.findElement(By.cssSelector("button[type='submit']")).click();
        assertTrue(driver.findElement(By.id("welcome")).isDisplayed());
    }
}
"#;

/// A test whose only statement has no neutral form and no mapping.
pub const SELENIUM_JAVA_UNSUPPORTED: &str = r#"import org.openqa.selenium.WebDriver;

public class WindowTest {
    private WebDriver driver;

    @Test
    public void maximizesWindow() {
        driver.get("https://example.com");
        driver.manage().window().maximize();
    }
}
"#;

pub const SELENIUM_JAVA_NO_TESTS: &str = r#"import org.openqa.selenium.WebDriver;

public class Helpers {
    public void open(WebDriver driver) {
        driver.get("https://example.com");
    }
}
"#;

pub const SELENIUM_JAVA_SLEEPY: &str = r#"import org.openqa.selenium.By;
import org.openqa.selenium.WebDriver;

public class SearchTest {
    private WebDriver driver;

    @Test
    public void searchesCatalog() {
        driver.get("https://shop.example.com");
        driver.findElement(By.name("q")).clear();
        driver.findElement(By.name("q")).sendKeys("lamp");
        Thread.sleep(2000);
        assertEquals("Results", driver.findElement(By.id("heading")).getText());
    }
}
"#;

/// A wait built and used in one statement.
pub const SELENIUM_JAVA_INLINE_WAIT: &str = r#"import org.openqa.selenium.By;
import org.openqa.selenium.WebDriver;
import org.openqa.selenium.support.ui.ExpectedConditions;
import org.openqa.selenium.support.ui.WebDriverWait;
import java.time.Duration;

public class NewsletterTest {
    private WebDriver driver;

    @Test
    public void subscribes() {
        driver.get("https://example.com/news");
        new WebDriverWait(driver, Duration.ofSeconds(5)).until(ExpectedConditions.visibilityOfElementLocated(By.id("email")));
        driver.findElement(By.id("email")).sendKeys("a@b.c");
        driver.findElement(By.id("subscribe")).click();
    }
}
"#;

pub const SELENIUM_PYTHON_SEARCH: &str = r#"from selenium import webdriver
from selenium.webdriver.common.by import By


def test_search(driver):
    driver.get("https://example.com")
    driver.find_element(By.NAME, "q").send_keys("rust")
    driver.find_element(By.ID, "go").click()
    assert "Results" in driver.title
"#;

pub const CYPRESS_LOGIN: &str = r#"describe('Login', () => {
  beforeEach(() => {
    cy.visit('/login');
  });

  it('logs in with valid credentials', () => {
    cy.get('#username').type('alice');
    cy.get('#password').type('secret');
    cy.get('button[type=submit]').click();
    cy.contains('Welcome').should('be.visible');
    cy.url().should('include', '/dashboard');
  });
});
"#;

pub const CYPRESS_API: &str = r#"describe('Users API', () => {
  it('creates a user', () => {
    cy.request('POST', '/users', { name: 'bob' }).then((resp) => {
      expect(resp.status).to.eq(201)
      expect(resp.body.name).to.eq('bob')
      expect(resp.body).to.have.property('id')
    })
  })

  it('updates with options', () => {
    cy.request({ method: 'PUT', url: '/users/1', body: { name: 'amy', tags: ['a'] }, headers: { 'X-Token': 'abc' } })
  })

  it('posts a computed body', () => {
    cy.request('POST', '/users', buildUser())
  })
})
"#;

pub const GHERKIN_LOGIN: &str = r#"@smoke
Feature: Login

  Background:
    Given I am on "/login"

  Scenario: Valid login
    When I fill in "Username" with "alice"
    And I click "Sign in" button
    Then I should see "Welcome"
    But I should not see "Error"

  Scenario: Unknown phrasing
    Given the moon is full
"#;

pub const GHERKIN_API: &str = r#"Feature: Users API

  Scenario: create a user
    When I send a POST request to "/users"
      """
      {"name": "bob"}
      """
    Then the response status should be 201
"#;

pub const GHERKIN_OUTLINE: &str = r#"Feature: Buttons

  Scenario Outline: pressing a button
    Given I am on "/panel"
    When I click "<btn>" button
    Then I should see "<message>"

    Examples:
      | btn | message |
      | A   | Alpha   |
      | B   | Bravo   |
"#;

pub const REST_ASSURED_GET_USER: &str = r#"import io.restassured.RestAssured;
import org.junit.jupiter.api.*;
import static io.restassured.RestAssured.given;
import static org.hamcrest.Matchers.*;

public class UserApiTest {
    @BeforeAll
    static void setup() {
        RestAssured.baseURI = "https://api.example.com";
    }

    @Test
    public void getUserById() {
        given()
            .header("Accept", "application/json")
        .when()
            .get("/users/1")
        .then()
            .statusCode(200)
            .body("name", equalTo("Leanne"));
    }
}
"#;

/// Plain text no parser claims.
pub const PROSE: &str = "Remember to water the plants on Tuesday.\n";
